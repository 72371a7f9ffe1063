use bytes::Bytes;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tonic::Status;
use uuid::Uuid;

use crate::codec::Serialization;
use crate::server::ServerHandler;

/// One encoded request on its way to a server handler.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcRequest {
    pub id: Uuid,
    /// Registry tag the request is addressed to.
    pub tag: String,
    /// Request name within the group.
    pub name: String,
    pub payload: Bytes,
}

impl RpcRequest {
    pub fn new(tag: impl Into<String>, name: impl Into<String>, payload: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
            name: name.into(),
            payload,
        }
    }
}

impl fmt::Debug for RpcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcRequest")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// The transport that carries requests to a server handler.
///
/// Implementations own connection management and framing. The returned bytes
/// are an encoded [`Exit`](crate::codec::Exit) envelope.
pub trait Protocol: Send + Sync {
    /// Serialization spoken by the remote end.
    fn serialization(&self) -> Serialization {
        Serialization::Protobuf
    }

    fn send(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>>;
}

impl<P: Protocol + ?Sized> Protocol for Arc<P> {
    fn serialization(&self) -> Serialization {
        (**self).serialization()
    }

    fn send(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>> {
        (**self).send(request)
    }
}

impl<P: Protocol + ?Sized> Protocol for &P {
    fn serialization(&self) -> Serialization {
        (**self).serialization()
    }

    fn send(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>> {
        (**self).send(request)
    }
}

/// Delivers requests to a [`ServerHandler`] in the same process.
///
/// Useful for server-side call sites that want the request contract without
/// a network hop, and for tests.
#[derive(Clone)]
pub struct LocalProtocol {
    handler: ServerHandler,
}

impl LocalProtocol {
    pub fn new(handler: ServerHandler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &ServerHandler {
        &self.handler
    }
}

impl Protocol for LocalProtocol {
    fn serialization(&self) -> Serialization {
        self.handler.serialization()
    }

    fn send(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>> {
        Box::pin(self.handler.handle(request))
    }
}
