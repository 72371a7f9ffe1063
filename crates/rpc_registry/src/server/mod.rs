//! Server-side types for rpc_registry.
//!
//! This module contains the [`ServerHandler`] and related types for turning a
//! set of per-request implementations into a single request-handling entry
//! point. Coverage of the group is checked once, when the handler is built.

mod config;
mod handler;

use bytes::Bytes;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tonic::{Extensions, Status};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::Serialization;
use crate::error::ServerError;
use crate::group::{Contains, Rpc, RpcGroup};
use crate::protocol::RpcRequest;

pub use config::ServerConfig;
pub use handler::{Implementation, ImplementationFn, make_implementation};

use handler::ErasedHandler;

/// Per-request information handed to every implementation.
#[derive(Clone)]
pub struct RequestContext {
    request_id: Uuid,
    tag: Arc<str>,
    name: &'static str,
    extensions: Arc<Extensions>,
}

impl RequestContext {
    pub(crate) fn new(
        request_id: Uuid,
        tag: Arc<str>,
        name: &'static str,
        extensions: Arc<Extensions>,
    ) -> Self {
        Self {
            request_id,
            tag,
            name,
            extensions,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Name of the request being handled.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a value from the server's extra context.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish()
    }
}

/// The implementations for a group, keyed by request name.
///
/// Groups declared with [`rpc_group!`](crate::rpc_group) convert their
/// handlers struct into this type, so coverage is already guaranteed by the
/// compiler. Groups implemented by hand build it directly and rely on
/// [`check`](Self::check) when the server handler is built.
///
/// ```ignore
/// let implementations = Implementations::<Greeter, GreeterDeps>::new()
///     .handle::<SayHelloReq, _, _>(|payload, deps, _ctx| async move {
///         Ok(format!("Hello {}", payload.name))
///     })
///     .handle::<SayByeReq, _, _>(say_bye);
/// ```
pub struct Implementations<G, D> {
    handlers: HashMap<&'static str, Arc<dyn ErasedHandler<D>>, ahash::RandomState>,
    duplicates: Vec<&'static str>,
    _group: PhantomData<fn() -> G>,
}

impl<G, D> Implementations<G, D>
where
    G: RpcGroup,
    D: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::default(),
            duplicates: Vec::new(),
            _group: PhantomData,
        }
    }

    /// Bind the implementation of request `R`.
    pub fn handle<R, F, Fut>(self, f: F) -> Self
    where
        R: Rpc,
        G: Contains<R>,
        F: Fn(R::Payload, Arc<D>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Success, R::Failure>> + Send + 'static,
    {
        self.with(Implementation::<R, D>::new(f))
    }

    /// Bind an already built implementation of request `R`.
    pub fn with<R>(mut self, implementation: Implementation<R, D>) -> Self
    where
        R: Rpc,
        G: Contains<R>,
    {
        if self.handlers.insert(R::NAME, Arc::new(implementation)).is_some() {
            self.duplicates.push(R::NAME);
        }
        self
    }

    /// Names with an implementation bound, in no particular order.
    pub fn implemented(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Check that the implementations cover the group exactly.
    pub fn check(&self) -> Result<(), ServerError> {
        let declared = G::requests();

        let mut names = HashSet::with_capacity(declared.len());
        for descriptor in declared {
            if !names.insert(descriptor.name()) {
                return Err(ServerError::DuplicateRequest {
                    group: G::NAME,
                    name: descriptor.name(),
                });
            }
        }

        if let Some(&name) = self.duplicates.first() {
            return Err(ServerError::DuplicateImplementation {
                group: G::NAME,
                name,
            });
        }

        if let Some(descriptor) = declared
            .iter()
            .find(|descriptor| !self.handlers.contains_key(descriptor.name()))
        {
            return Err(ServerError::MissingImplementation {
                group: G::NAME,
                name: descriptor.name(),
            });
        }

        if let Some(&name) = self.handlers.keys().find(|name| !names.contains(*name)) {
            return Err(ServerError::UnexpectedImplementation {
                group: G::NAME,
                name,
            });
        }

        Ok(())
    }
}

impl<G, D> Default for Implementations<G, D>
where
    G: RpcGroup,
    D: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Routes decoded requests to implementations; erases the dependency type.
trait Dispatch: Send + Sync {
    fn dispatch(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>>;
}

struct Dispatcher<D> {
    routes: HashMap<&'static str, Arc<dyn ErasedHandler<D>>, ahash::RandomState>,
    dependencies: Arc<D>,
    serialization: Serialization,
    extensions: Arc<Extensions>,
    tag: Arc<str>,
}

impl<D: Send + Sync + 'static> Dispatch for Dispatcher<D> {
    fn dispatch(&self, request: RpcRequest) -> BoxFuture<'_, Result<Bytes, Status>> {
        Box::pin(async move {
            let Some((&name, handler)) = self.routes.get_key_value(request.name.as_str()) else {
                warn!(
                    request_id = %request.id,
                    tag = %self.tag,
                    request = %request.name,
                    "No implementation for request"
                );
                return Err(Status::unimplemented(format!(
                    "no implementation for '{}' under tag '{}'",
                    request.name, self.tag
                )));
            };

            debug!(
                request_id = %request.id,
                tag = %self.tag,
                request = name,
                "Handling request"
            );

            let ctx = RequestContext::new(
                request.id,
                Arc::clone(&self.tag),
                name,
                Arc::clone(&self.extensions),
            );
            let exit = handler
                .call(
                    request.payload,
                    Arc::clone(&self.dependencies),
                    ctx,
                    self.serialization,
                )
                .await?;

            Ok::<_, Status>(self.serialization.encode(&exit))
        })
    }
}

/// A request-handling entry point for one registered group.
///
/// Cheap to clone; every clone shares the same routes and dependencies.
#[derive(Clone)]
pub struct ServerHandler {
    tag: Arc<str>,
    group: &'static str,
    serialization: Serialization,
    inner: Arc<dyn Dispatch>,
}

impl ServerHandler {
    /// Build a handler after checking that `implementations` covers `G`.
    pub(crate) fn new<G, D>(
        tag: Arc<str>,
        implementations: Implementations<G, D>,
        config: ServerConfig<D>,
    ) -> Result<Self, ServerError>
    where
        G: RpcGroup,
        D: Send + Sync + 'static,
    {
        implementations.check().inspect_err(|e| {
            warn!(tag = %tag, group = G::NAME, error = %e, "Rejected server handler");
        })?;

        info!(
            tag = %tag,
            group = G::NAME,
            requests = implementations.handlers.len(),
            serialization = ?config.serialization,
            "Built server handler"
        );

        let dispatcher = Dispatcher {
            routes: implementations.handlers,
            dependencies: config.dependencies,
            serialization: config.serialization,
            extensions: Arc::new(config.extensions),
            tag: Arc::clone(&tag),
        };

        Ok(Self {
            tag,
            group: G::NAME,
            serialization: config.serialization,
            inner: Arc::new(dispatcher),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Name of the group this handler serves.
    pub fn group(&self) -> &'static str {
        self.group
    }

    pub fn serialization(&self) -> Serialization {
        self.serialization
    }

    /// Handle one encoded request, returning an encoded exit envelope.
    ///
    /// Requests addressed to another tag are rejected with `NOT_FOUND`,
    /// unknown request names with `UNIMPLEMENTED` and undecodable payloads
    /// with `INVALID_ARGUMENT`.
    pub async fn handle(&self, request: RpcRequest) -> Result<Bytes, Status> {
        if request.tag != *self.tag {
            warn!(
                request_id = %request.id,
                tag = %self.tag,
                requested_tag = %request.tag,
                "Request addressed to another tag"
            );
            return Err(Status::not_found(format!(
                "handler serves tag '{}', not '{}'",
                self.tag, request.tag
            )));
        }

        self.inner.dispatch(request).await
    }

    /// Convert into a plain function, for mounting on an endpoint.
    pub fn into_fn(
        self,
    ) -> impl Fn(RpcRequest) -> BoxFuture<'static, Result<Bytes, Status>> + Clone + Send + Sync
    {
        move |request: RpcRequest| -> BoxFuture<'static, Result<Bytes, Status>> {
            let handler = self.clone();
            Box::pin(async move { handler.handle(request).await })
        }
    }
}

impl fmt::Debug for ServerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandler")
            .field("tag", &self.tag)
            .field("group", &self.group)
            .field("serialization", &self.serialization)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Exit, exit::Outcome};
    use crate::group::RequestDescriptor;
    use crate::testing::{
        ChargeReq, Greeter, GreeterDeps, SayByeReq, SayHello, SayHelloReq,
        greeter_implementations, say_bye, say_hello,
    };
    use tonic::Code;

    #[derive(Clone, Debug, PartialEq)]
    struct Region(&'static str);

    fn greeter_handler(serialization: Serialization) -> ServerHandler {
        let config = ServerConfig::new(GreeterDeps::default())
            .with_serialization(serialization)
            .with_extension(Region("eu-west"));
        ServerHandler::new(Arc::from("greeter"), greeter_implementations(), config).unwrap()
    }

    fn hello_request(serialization: Serialization, name: &str) -> RpcRequest {
        RpcRequest::new(
            "greeter",
            SayHelloReq::NAME,
            serialization.encode(&SayHello {
                name: name.to_string(),
            }),
        )
    }

    async fn reply(handler: &ServerHandler, request: RpcRequest) -> Outcome {
        let bytes = handler.handle(request).await.unwrap();
        let exit: Exit = handler.serialization().decode(bytes).unwrap();
        exit.outcome.unwrap()
    }

    /// Declares `SayHelloReq` but also claims to contain `ChargeReq`.
    struct Lopsided;

    impl RpcGroup for Lopsided {
        const NAME: &'static str = "Lopsided";
        type Handlers<D: Send + Sync + 'static> = Implementations<Self, D>;

        fn requests() -> &'static [RequestDescriptor] {
            const REQUESTS: &[RequestDescriptor] = &[RequestDescriptor::of::<SayHelloReq>()];
            REQUESTS
        }
    }

    impl Contains<SayHelloReq> for Lopsided {}
    impl Contains<ChargeReq> for Lopsided {}

    /// Declares `SayHelloReq` twice.
    struct Doubled;

    impl RpcGroup for Doubled {
        const NAME: &'static str = "Doubled";
        type Handlers<D: Send + Sync + 'static> = Implementations<Self, D>;

        fn requests() -> &'static [RequestDescriptor] {
            const REQUESTS: &[RequestDescriptor] = &[
                RequestDescriptor::of::<SayHelloReq>(),
                RequestDescriptor::of::<SayHelloReq>(),
            ];
            REQUESTS
        }
    }

    impl Contains<SayHelloReq> for Doubled {}

    #[test]
    fn test_check_accepts_full_coverage() {
        let implementations = greeter_implementations();
        assert!(implementations.check().is_ok());

        let mut names: Vec<_> = implementations.implemented().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["SayByeReq", "SayHelloReq"]);
    }

    #[test]
    fn test_check_reports_missing_implementation() {
        let implementations =
            Implementations::<Greeter, GreeterDeps>::new().handle::<SayHelloReq, _, _>(say_hello);

        assert_eq!(
            implementations.check(),
            Err(ServerError::MissingImplementation {
                group: "Greeter",
                name: "SayByeReq",
            })
        );
    }

    #[test]
    fn test_check_reports_duplicate_implementation() {
        let implementations = greeter_implementations().handle::<SayByeReq, _, _>(say_bye);

        assert_eq!(
            implementations.check(),
            Err(ServerError::DuplicateImplementation {
                group: "Greeter",
                name: "SayByeReq",
            })
        );
    }

    #[test]
    fn test_check_reports_unexpected_implementation() {
        let implementations = Implementations::<Lopsided, ()>::new()
            .handle::<SayHelloReq, _, _>(|payload: SayHello, _deps, _ctx| async move {
                Ok(payload.name)
            })
            .handle::<ChargeReq, _, _>(|_payload, _deps, _ctx| async move { Ok(()) });

        assert_eq!(
            implementations.check(),
            Err(ServerError::UnexpectedImplementation {
                group: "Lopsided",
                name: "ChargeReq",
            })
        );
    }

    #[test]
    fn test_check_reports_duplicate_request() {
        let implementations = Implementations::<Doubled, ()>::new()
            .handle::<SayHelloReq, _, _>(|payload: SayHello, _deps, _ctx| async move {
                Ok(payload.name)
            });

        assert_eq!(
            implementations.check(),
            Err(ServerError::DuplicateRequest {
                group: "Doubled",
                name: "SayHelloReq",
            })
        );
    }

    #[test]
    fn test_incomplete_implementations_are_rejected_at_build() {
        let implementations =
            Implementations::<Greeter, GreeterDeps>::new().handle::<SayByeReq, _, _>(say_bye);
        let result = ServerHandler::new(
            Arc::from("greeter"),
            implementations,
            ServerConfig::new(GreeterDeps::default()),
        );

        assert!(matches!(
            result,
            Err(ServerError::MissingImplementation {
                name: "SayHelloReq",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_handle_routes_by_name() {
        let handler = greeter_handler(Serialization::Protobuf);

        let Outcome::Success(bytes) =
            reply(&handler, hello_request(Serialization::Protobuf, "Ben")).await
        else {
            panic!("expected success");
        };
        let text: String = Serialization::Protobuf.decode(bytes).unwrap();
        assert_eq!(text, "Hello Ben");

        let request = RpcRequest::new(
            "greeter",
            SayByeReq::NAME,
            Serialization::Protobuf.encode(&SayHello {
                name: "Ben".to_string(),
            }),
        );
        let Outcome::Success(bytes) = reply(&handler, request).await else {
            panic!("expected success");
        };
        let text: String = Serialization::Protobuf.decode(bytes).unwrap();
        assert_eq!(text, "Bye Ben");
    }

    #[tokio::test]
    async fn test_handle_with_delimited_serialization() {
        let handler = greeter_handler(Serialization::ProtobufDelimited);

        let outcome = reply(
            &handler,
            hello_request(Serialization::ProtobufDelimited, "Ada"),
        )
        .await;
        let Outcome::Success(bytes) = outcome else {
            panic!("expected success");
        };
        let text: String = Serialization::ProtobufDelimited.decode(bytes).unwrap();
        assert_eq!(text, "Hello Ada");
    }

    #[tokio::test]
    async fn test_handle_rejects_unknown_name() {
        let handler = greeter_handler(Serialization::Protobuf);
        let request = RpcRequest::new("greeter", "SayWhatReq", Bytes::new());

        let status = handler.handle(request).await.unwrap_err();
        assert_eq!(status.code(), Code::Unimplemented);
    }

    #[tokio::test]
    async fn test_handle_rejects_other_tag() {
        let handler = greeter_handler(Serialization::Protobuf);
        let mut request = hello_request(Serialization::Protobuf, "Ben");
        request.tag = "billing".to_string();

        let status = handler.handle(request).await.unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_context_carries_extensions() {
        let implementations = Implementations::<Greeter, ()>::new()
            .handle::<SayHelloReq, _, _>(|_payload, _deps, ctx: RequestContext| async move {
                let region = ctx.extension::<Region>().map(|r| r.0).unwrap_or("none");
                Ok(format!("{} from {region}", ctx.name()))
            })
            .handle::<SayByeReq, _, _>(|_payload, _deps, _ctx| async move { Ok(String::new()) });
        let config = ServerConfig::new(()).with_extension(Region("eu-west"));
        let handler = ServerHandler::new(Arc::from("greeter"), implementations, config).unwrap();

        let Outcome::Success(bytes) =
            reply(&handler, hello_request(Serialization::Protobuf, "Ben")).await
        else {
            panic!("expected success");
        };
        let text: String = Serialization::Protobuf.decode(bytes).unwrap();
        assert_eq!(text, "SayHelloReq from eu-west");
    }

    #[tokio::test]
    async fn test_into_fn_shares_dependencies() {
        let deps = Arc::new(GreeterDeps::default());
        let handler = ServerHandler::new(
            Arc::from("greeter"),
            greeter_implementations(),
            ServerConfig::new(Arc::clone(&deps)),
        )
        .unwrap();
        let endpoint = handler.into_fn();

        let a = endpoint.clone()(hello_request(Serialization::Protobuf, "Ben"));
        let b = endpoint(hello_request(Serialization::Protobuf, "Ada"));
        let (a, b) = futures::join!(a, b);

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(deps.greeted(), 2);
    }
}
