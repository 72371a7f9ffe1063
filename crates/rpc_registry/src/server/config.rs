use bon::Builder;
use std::fmt;
use std::sync::Arc;
use tonic::Extensions;

use crate::codec::Serialization;

/// Configuration for a server handler.
///
/// `D` is the dependency set every implementation receives.
///
/// ```ignore
/// let config = ServerConfig::builder()
///     .dependencies(GreeterDeps::default())
///     .serialization(Serialization::ProtobufDelimited)
///     .build();
/// ```
#[derive(Builder)]
pub struct ServerConfig<D> {
    /// Dependencies handed to every implementation.
    #[builder(into)]
    pub dependencies: Arc<D>,

    /// Wire serialization, protobuf by default.
    #[builder(default)]
    pub serialization: Serialization,

    /// Extra context visible to implementations through
    /// [`RequestContext::extension`](crate::server::RequestContext::extension).
    #[builder(default)]
    pub extensions: Extensions,
}

impl<D> ServerConfig<D> {
    /// Config with default serialization and no extra context.
    pub fn new(dependencies: impl Into<Arc<D>>) -> Self {
        Self {
            dependencies: dependencies.into(),
            serialization: Serialization::default(),
            extensions: Extensions::default(),
        }
    }

    /// Set the serialization.
    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = serialization;
        self
    }

    /// Add a value to the extra context.
    pub fn with_extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }
}

impl<D> fmt::Debug for ServerConfig<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("dependencies", &std::any::type_name::<D>())
            .field("serialization", &self.serialization)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
