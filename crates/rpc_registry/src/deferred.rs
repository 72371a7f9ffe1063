use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::client::RpcClient;
use crate::error::RpcError;
use crate::group::{Contains, Rpc};
use crate::protocol::Protocol;

/// A request that has been described but not sent.
///
/// Nothing happens until [`run`](Deferred::run) is awaited. Each run builds a
/// fresh [`RpcClient`] for the group and releases it when the call finishes,
/// so a `Deferred` can be cloned and run again for retries.
#[must_use = "deferred requests do nothing until run"]
pub struct Deferred<G, R: Rpc> {
    tag: Arc<str>,
    payload: R::Payload,
    _marker: PhantomData<fn() -> (G, R)>,
}

impl<G, R> Deferred<G, R>
where
    G: Contains<R>,
    R: Rpc,
{
    pub(crate) fn new(tag: Arc<str>, payload: R::Payload) -> Self {
        Self {
            tag,
            payload,
            _marker: PhantomData,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Name of the request this will submit.
    pub fn name(&self) -> &'static str {
        R::NAME
    }

    pub fn payload(&self) -> &R::Payload {
        &self.payload
    }

    /// Replace the payload, keeping the target.
    pub fn with_payload(mut self, payload: R::Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Send the request over `protocol` and wait for its outcome.
    ///
    /// Declared failures come back as [`RpcError::Failure`]; transport faults
    /// are passed through untouched as [`RpcError::Transport`].
    pub async fn run<P>(self, protocol: &P) -> Result<R::Success, RpcError<R::Failure>>
    where
        P: Protocol + ?Sized,
    {
        let client = RpcClient::<G, P>::new(protocol, self.tag);
        client.call::<R>(&self.payload).await
    }
}

impl<G, R> Clone for Deferred<G, R>
where
    R: Rpc,
    R::Payload: Clone,
{
    fn clone(&self) -> Self {
        Self {
            tag: Arc::clone(&self.tag),
            payload: self.payload.clone(),
            _marker: PhantomData,
        }
    }
}

impl<G, R: Rpc> fmt::Debug for Deferred<G, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("tag", &self.tag)
            .field("name", &R::NAME)
            .field("payload", &self.payload)
            .finish()
    }
}
