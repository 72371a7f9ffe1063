//! Typed request registries over a pluggable RPC protocol.
//!
//! Request contracts are declared once ([`Rpc`], [`rpc_group!`]) and registered
//! under a tag. A lookup yields a [`TaggedAccessor`], which describes requests
//! as [`Deferred`] values for the client side and binds implementations into a
//! [`ServerHandler`] for the server side.
//!
//! # Example
//!
//! ```ignore
//! use rpc_registry::{Implementation, LocalProtocol, Registry, RpcTag, ServerConfig};
//!
//! const GREETER: RpcTag<Greeter> = RpcTag::new("greeter");
//!
//! let registry = GREETER.register(&Registry::new(), Greeter)?;
//! let greeter = GREETER.get(&registry)?;
//!
//! let handler = greeter.server_handler(
//!     GreeterHandlers {
//!         say_hello: Implementation::new(say_hello),
//!         say_bye: Implementation::new(say_bye),
//!     },
//!     ServerConfig::new(GreeterDeps::default()),
//! )?;
//! let protocol = LocalProtocol::new(handler);
//!
//! let reply = greeter
//!     .request::<SayHelloReq>(SayHello { name: "Ben".into() })
//!     .run(&protocol)
//!     .await?;
//! ```

mod accessor;
mod client;
pub mod codec;
mod deferred;
pub mod error;
mod group;
mod protocol;
pub mod registry;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::TaggedAccessor;
pub use client::RpcClient;
pub use codec::Serialization;
pub use deferred::Deferred;
pub use error::{RegistryError, RpcError, ServerError};
pub use group::{Contains, RequestDescriptor, Rpc, RpcGroup};
pub use protocol::{LocalProtocol, Protocol, RpcRequest};
pub use registry::{Registry, RpcTag, get_handler, handler_tags, has_handler, register_handler};
pub use server::{Implementation, Implementations, RequestContext, ServerConfig, ServerHandler};
