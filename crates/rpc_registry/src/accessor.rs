use std::fmt;
use std::sync::Arc;

use crate::client::RpcClient;
use crate::deferred::Deferred;
use crate::error::ServerError;
use crate::group::{Contains, RequestDescriptor, Rpc, RpcGroup};
use crate::protocol::Protocol;
use crate::server::{Implementations, ServerConfig, ServerHandler};

/// A resolved registry entry: a tag and its group.
///
/// Handed out by registry lookups and registrations. Every operation is bound
/// to the tag, so call sites never repeat it.
pub struct TaggedAccessor<G> {
    tag: Arc<str>,
    group: Arc<G>,
}

impl<G: RpcGroup> TaggedAccessor<G> {
    pub(crate) fn new(tag: Arc<str>, group: Arc<G>) -> Self {
        Self { tag, group }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    /// Every request declared by the group.
    #[deprecated(note = "address requests by type with `request` instead")]
    pub fn requests(&self) -> &'static [RequestDescriptor] {
        G::requests()
    }

    /// Describe request `R` with `payload`. Nothing is sent until the returned
    /// value is run.
    pub fn request<R>(&self, payload: R::Payload) -> Deferred<G, R>
    where
        R: Rpc,
        G: Contains<R>,
    {
        Deferred::new(Arc::clone(&self.tag), payload)
    }

    /// Like [`request`](Self::request), but hands back a function that takes
    /// the payload later.
    pub fn request_fn<R>(
        &self,
    ) -> impl Fn(R::Payload) -> Deferred<G, R> + Clone + Send + Sync + use<G, R>
    where
        R: Rpc,
        G: Contains<R>,
    {
        let tag = Arc::clone(&self.tag);
        move |payload: R::Payload| -> Deferred<G, R> {
            Deferred::new(Arc::clone(&tag), payload)
        }
    }

    /// A client for this group over `protocol`.
    pub fn client<'p, P>(&self, protocol: &'p P) -> RpcClient<'p, G, P>
    where
        P: Protocol + ?Sized,
    {
        RpcClient::new(protocol, Arc::clone(&self.tag))
    }

    /// Bind `handlers` into a request handler for this tag.
    ///
    /// For groups declared with [`rpc_group!`](crate::rpc_group) the handlers
    /// struct has one required field per request, so a missing implementation
    /// does not compile. The resulting route table is checked again before the
    /// handler is built.
    pub fn server_handler<D>(
        &self,
        handlers: G::Handlers<D>,
        config: ServerConfig<D>,
    ) -> Result<ServerHandler, ServerError>
    where
        D: Send + Sync + 'static,
    {
        let implementations: Implementations<G, D> = handlers.into();
        ServerHandler::new(Arc::clone(&self.tag), implementations, config)
    }
}

impl<G> Clone for TaggedAccessor<G> {
    fn clone(&self) -> Self {
        Self {
            tag: Arc::clone(&self.tag),
            group: Arc::clone(&self.group),
        }
    }
}

impl<G: RpcGroup> fmt::Debug for TaggedAccessor<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedAccessor")
            .field("tag", &self.tag)
            .field("group", &G::NAME)
            .finish()
    }
}
