use bytes::Bytes;
use futures::future::BoxFuture;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tonic::Status;

use crate::codec::{Exit, Serialization};
use crate::group::Rpc;
use crate::server::RequestContext;

/// A type-erased implementation that can be stored in a HashMap.
///
/// This trait allows implementations of requests with different payload and
/// result types to live in a single route table.
pub(crate) trait ErasedHandler<D>: Send + Sync {
    /// Decode the payload, run the implementation and wrap its outcome.
    fn call(
        &self,
        payload: Bytes,
        dependencies: Arc<D>,
        ctx: RequestContext,
        serialization: Serialization,
    ) -> BoxFuture<'static, Result<Exit, Status>>;
}

/// An implementation function for request `R` with dependencies `D`.
///
/// The implementation receives:
/// - the decoded payload
/// - the configured dependencies
/// - the per-request context
///
/// and returns the declared success or failure.
pub type ImplementationFn<R, D> = Arc<
    dyn Fn(
            <R as Rpc>::Payload,
            Arc<D>,
            RequestContext,
        ) -> BoxFuture<'static, Result<<R as Rpc>::Success, <R as Rpc>::Failure>>
        + Send
        + Sync
        + 'static,
>;

/// The implementation of request `R` with dependencies `D`.
///
/// Each field of a group's handlers struct holds one of these, so the compiler
/// rejects a handlers value that leaves a request out.
pub struct Implementation<R: Rpc, D> {
    function: ImplementationFn<R, D>,
    _marker: PhantomData<fn() -> R>,
}

impl<R, D> Implementation<R, D>
where
    R: Rpc,
    D: Send + Sync + 'static,
{
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(R::Payload, Arc<D>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Success, R::Failure>> + Send + 'static,
    {
        Self::from_fn(make_implementation::<R, D, F, Fut>(f))
    }

    pub fn from_fn(function: ImplementationFn<R, D>) -> Self {
        Self {
            function,
            _marker: PhantomData,
        }
    }
}

impl<R: Rpc, D> Clone for Implementation<R, D> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
            _marker: PhantomData,
        }
    }
}

impl<R, D> ErasedHandler<D> for Implementation<R, D>
where
    R: Rpc,
    D: Send + Sync + 'static,
{
    fn call(
        &self,
        payload: Bytes,
        dependencies: Arc<D>,
        ctx: RequestContext,
        serialization: Serialization,
    ) -> BoxFuture<'static, Result<Exit, Status>> {
        let implementation = Arc::clone(&self.function);

        Box::pin(async move {
            let payload: R::Payload = serialization.decode(payload).map_err(|e| {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    tag = %ctx.tag(),
                    request = R::NAME,
                    error = %e,
                    "Failed to decode request payload"
                );
                Status::invalid_argument(format!("failed to decode '{}' payload: {e}", R::NAME))
            })?;

            let request_id = ctx.request_id();
            let exit = match implementation(payload, dependencies, ctx).await {
                Ok(success) => Exit::success(serialization.encode(&success)),
                Err(failure) => {
                    tracing::debug!(
                        request_id = %request_id,
                        request = R::NAME,
                        "Implementation returned declared failure"
                    );
                    Exit::failure(serialization.encode(&failure))
                }
            };

            Ok::<_, Status>(exit)
        })
    }
}

/// Helper to create a boxed implementation from an async function.
///
/// This handles the type gymnastics of boxing the closure and its future.
pub fn make_implementation<R, D, F, Fut>(f: F) -> ImplementationFn<R, D>
where
    R: Rpc,
    D: Send + Sync + 'static,
    F: Fn(R::Payload, Arc<D>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R::Success, R::Failure>> + Send + 'static,
{
    Arc::new(move |payload, dependencies, ctx| {
        Box::pin(f(payload, dependencies, ctx)) as BoxFuture<'static, Result<R::Success, R::Failure>>
    })
}
