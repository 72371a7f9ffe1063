//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::server::{Implementation, Implementations, RequestContext};
use crate::{Rpc, rpc_group};

#[derive(Clone, PartialEq, prost::Message)]
pub struct SayHello {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GreetingError {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Invoice {
    #[prost(uint64, tag = "1")]
    pub amount_cents: u64,
}

pub struct SayHelloReq;

impl Rpc for SayHelloReq {
    const NAME: &'static str = "SayHelloReq";
    type Payload = SayHello;
    type Success = String;
    type Failure = GreetingError;
}

pub struct SayByeReq;

impl Rpc for SayByeReq {
    const NAME: &'static str = "SayByeReq";
    type Payload = SayHello;
    type Success = String;
    type Failure = GreetingError;
}

pub struct ChargeReq;

impl Rpc for ChargeReq {
    const NAME: &'static str = "ChargeReq";
    type Payload = Invoice;
    type Success = ();
    type Failure = GreetingError;
}

rpc_group! {
    pub struct Greeter {
        say_hello: SayHelloReq,
        say_bye: SayByeReq,
    }
    pub struct GreeterHandlers;
}

rpc_group! {
    pub struct Billing {
        charge: ChargeReq,
    }
    pub struct BillingHandlers;
}

/// Dependencies injected into the greeter implementations.
#[derive(Debug, Default)]
pub struct GreeterDeps {
    pub greeted: AtomicUsize,
}

impl GreeterDeps {
    pub fn greeted(&self) -> usize {
        self.greeted.load(Ordering::SeqCst)
    }
}

pub async fn say_hello(
    payload: SayHello,
    deps: Arc<GreeterDeps>,
    _ctx: RequestContext,
) -> Result<String, GreetingError> {
    if payload.name.is_empty() {
        return Err(GreetingError {
            reason: "name must not be empty".to_string(),
        });
    }
    deps.greeted.fetch_add(1, Ordering::SeqCst);
    Ok(format!("Hello {}", payload.name))
}

pub async fn say_bye(
    payload: SayHello,
    _deps: Arc<GreeterDeps>,
    _ctx: RequestContext,
) -> Result<String, GreetingError> {
    Ok(format!("Bye {}", payload.name))
}

/// Handlers covering every request of [`Greeter`].
pub fn greeter_handlers() -> GreeterHandlers<GreeterDeps> {
    GreeterHandlers {
        say_hello: Implementation::new(say_hello),
        say_bye: Implementation::new(say_bye),
    }
}

pub fn greeter_implementations() -> Implementations<Greeter, GreeterDeps> {
    greeter_handlers().into()
}
