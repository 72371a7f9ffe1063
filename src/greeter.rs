//! A small greeting service used by the demo binary.

use rpc_registry::{Implementation, RequestContext, Rpc, RpcTag, rpc_group};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tag the greeter group is registered under.
pub const GREETER: RpcTag<Greeter> = RpcTag::new("greeter");

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
pub struct GreetingStats {
    #[prost(uint64, tag = "1")]
    pub greeted: u64,
}

pub struct SayHelloReq;

impl Rpc for SayHelloReq {
    const NAME: &'static str = "SayHelloReq";
    type Payload = SayHello;
    type Success = String;
    type Failure = GreetingError;
}

pub struct StatsReq;

impl Rpc for StatsReq {
    const NAME: &'static str = "StatsReq";
    type Payload = ();
    type Success = GreetingStats;
    type Failure = GreetingError;
}

rpc_group! {
    /// Greeting endpoints.
    pub struct Greeter {
        say_hello: SayHelloReq,
        stats: StatsReq,
    }
    /// Implementations of every greeter request.
    pub struct GreeterHandlers;
}

/// State shared by the greeter implementations.
#[derive(Debug, Default)]
pub struct GreeterState {
    greeted: AtomicU64,
}

async fn say_hello(
    payload: SayHello,
    state: Arc<GreeterState>,
    ctx: RequestContext,
) -> Result<String, GreetingError> {
    if payload.name.trim().is_empty() {
        return Err(GreetingError {
            reason: "name must not be empty".to_string(),
        });
    }

    state.greeted.fetch_add(1, Ordering::Relaxed);
    tracing::info!(request_id = %ctx.request_id(), name = %payload.name, "Greeting");
    Ok(format!("Hello {}", payload.name))
}

async fn stats(
    _payload: (),
    state: Arc<GreeterState>,
    _ctx: RequestContext,
) -> Result<GreetingStats, GreetingError> {
    Ok(GreetingStats {
        greeted: state.greeted.load(Ordering::Relaxed),
    })
}

pub fn handlers() -> GreeterHandlers<GreeterState> {
    GreeterHandlers {
        say_hello: Implementation::new(say_hello),
        stats: Implementation::new(stats),
    }
}
