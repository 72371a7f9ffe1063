use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::codec::{Exit, exit};
use crate::error::RpcError;
use crate::group::{Contains, RequestDescriptor, Rpc, RpcGroup};
use crate::protocol::{Protocol, RpcRequest};

/// A client for one request group, bound to a protocol.
///
/// Exposes one method per declared request name. Clients are cheap and meant
/// to be scoped to a single dispatch; [`Deferred`](crate::Deferred) builds a
/// fresh one every time it runs.
pub struct RpcClient<'p, G, P: ?Sized> {
    protocol: &'p P,
    tag: Arc<str>,
    methods: HashMap<&'static str, RequestDescriptor, ahash::RandomState>,
    _group: PhantomData<fn() -> G>,
}

impl<'p, G, P> RpcClient<'p, G, P>
where
    G: RpcGroup,
    P: Protocol + ?Sized,
{
    pub fn new(protocol: &'p P, tag: impl Into<Arc<str>>) -> Self {
        let tag = tag.into();
        let methods = G::requests()
            .iter()
            .map(|descriptor| (descriptor.name(), *descriptor))
            .collect();

        trace!(tag = %tag, group = G::NAME, "Constructed client");

        Self {
            protocol,
            tag,
            methods,
            _group: PhantomData,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Look up a method by request name.
    pub fn method(&self, name: &str) -> Option<&RequestDescriptor> {
        self.methods.get(name)
    }

    /// Names of every callable method, in no particular order.
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    /// Submit `payload` as request `R` and wait for its outcome.
    pub async fn call<R>(&self, payload: &R::Payload) -> Result<R::Success, RpcError<R::Failure>>
    where
        R: Rpc,
        G: Contains<R>,
    {
        let Some(descriptor) = self.method(R::NAME) else {
            warn!(
                tag = %self.tag,
                group = G::NAME,
                request = R::NAME,
                "Request not found on constructed client"
            );
            return Err(RpcError::UnknownRequest {
                group: G::NAME,
                name: R::NAME,
            });
        };

        let serialization = self.protocol.serialization();
        let request = RpcRequest::new(
            &*self.tag,
            descriptor.name(),
            serialization.encode(payload),
        );
        let request_id = request.id;

        debug!(
            request_id = %request_id,
            tag = %self.tag,
            request = R::NAME,
            "Dispatching request"
        );

        let bytes = self.protocol.send(request).await.inspect_err(|status| {
            warn!(
                request_id = %request_id,
                tag = %self.tag,
                request = R::NAME,
                error = %status,
                "Transport failed"
            );
        })?;

        let envelope: Exit = serialization.decode(bytes)?;
        match envelope.outcome {
            Some(exit::Outcome::Success(bytes)) => Ok(serialization.decode(bytes)?),
            Some(exit::Outcome::Failure(bytes)) => {
                Err(RpcError::Failure(serialization.decode(bytes)?))
            }
            None => Err(RpcError::MalformedExit),
        }
    }
}

impl<G, P: ?Sized> Drop for RpcClient<'_, G, P> {
    fn drop(&mut self) {
        trace!(tag = %self.tag, "Released client");
    }
}
