//! Request contracts and request groups.
//!
//! A request is declared once as a type implementing [`Rpc`]: its wire name
//! plus the payload, success and failure messages. Requests are bundled into
//! a group with [`rpc_group!`](crate::rpc_group), which also records at the
//! type level which requests belong to the group through [`Contains`].
//!
//! ```ignore
//! pub struct SayHelloReq;
//!
//! impl Rpc for SayHelloReq {
//!     const NAME: &'static str = "SayHelloReq";
//!     type Payload = SayHello;
//!     type Success = String;
//!     type Failure = GreetingError;
//! }
//!
//! rpc_group! {
//!     pub struct Greeter {
//!         say_hello: SayHelloReq,
//!         say_bye: SayByeReq,
//!     }
//!     pub struct GreeterHandlers;
//! }
//! ```

use std::any::type_name;
use std::fmt;

use crate::server::Implementations;

/// A single request contract.
pub trait Rpc: Send + Sync + 'static {
    /// Name used to identify the request over the wire. Unique within a group.
    const NAME: &'static str;

    type Payload: prost::Message + fmt::Debug + Default + Send + Sync + 'static;
    type Success: prost::Message + Default + Send + 'static;
    type Failure: prost::Message + Default + Send + 'static;
}

/// A named bundle of request contracts.
pub trait RpcGroup: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    /// One implementation per declared request, bound to dependencies `D`.
    ///
    /// [`rpc_group!`](crate::rpc_group) generates a struct with a field per
    /// request. Groups implemented by hand may use [`Implementations`] and
    /// rely on the check made when the server handler is built.
    type Handlers<D: Send + Sync + 'static>: Into<Implementations<Self, D>>;

    /// Declared requests, in declaration order.
    fn requests() -> &'static [RequestDescriptor];
}

/// Marker proving that `R` is one of the group's declared requests.
///
/// Dispatch and implementation binding are bounded by this trait, so naming a
/// request outside the group does not compile.
pub trait Contains<R: Rpc>: RpcGroup {}

/// Introspection record for a declared request.
#[derive(Clone, Copy)]
pub struct RequestDescriptor {
    name: &'static str,
    payload: fn() -> &'static str,
    success: fn() -> &'static str,
    failure: fn() -> &'static str,
}

impl RequestDescriptor {
    pub const fn of<R: Rpc>() -> Self {
        Self {
            name: R::NAME,
            payload: type_name::<R::Payload>,
            success: type_name::<R::Success>,
            failure: type_name::<R::Failure>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the payload message.
    pub fn payload_type(&self) -> &'static str {
        (self.payload)()
    }

    pub fn success_type(&self) -> &'static str {
        (self.success)()
    }

    pub fn failure_type(&self) -> &'static str {
        (self.failure)()
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("name", &self.name)
            .field("payload", &self.payload_type())
            .field("success", &self.success_type())
            .field("failure", &self.failure_type())
            .finish()
    }
}

impl PartialEq for RequestDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.payload_type() == other.payload_type()
            && self.success_type() == other.success_type()
            && self.failure_type() == other.failure_type()
    }
}

impl Eq for RequestDescriptor {}

/// Declare a request group.
///
/// Expands to:
/// - a unit struct implementing [`RpcGroup`];
/// - one [`Contains`] impl per listed request;
/// - a handlers struct, generic over the server dependencies, with one public
///   [`Implementation`](crate::Implementation) field per request.
///
/// [`TaggedAccessor::server_handler`](crate::TaggedAccessor::server_handler)
/// takes the handlers struct, so every request must be implemented for the
/// server to compile.
///
/// ```
/// use std::sync::Arc;
/// use rpc_registry::{Implementation, RequestContext, Rpc, RpcGroup, rpc_group};
///
/// pub struct Ping;
///
/// impl Rpc for Ping {
///     const NAME: &'static str = "Ping";
///     type Payload = String;
///     type Success = String;
///     type Failure = String;
/// }
///
/// pub struct Echo;
///
/// impl Rpc for Echo {
///     const NAME: &'static str = "Echo";
///     type Payload = String;
///     type Success = String;
///     type Failure = String;
/// }
///
/// rpc_group! {
///     /// Liveness endpoints.
///     pub struct Pinger {
///         ping: Ping,
///         echo: Echo,
///     }
///     pub struct PingerHandlers;
/// }
///
/// async fn reply(payload: String, _deps: Arc<()>, _ctx: RequestContext) -> Result<String, String> {
///     Ok(payload)
/// }
///
/// let handlers: PingerHandlers<()> = PingerHandlers {
///     ping: Implementation::new(reply),
///     echo: Implementation::new(reply),
/// };
/// # let _ = handlers;
/// assert_eq!(Pinger::requests().len(), 2);
/// ```
///
/// Leaving a request out does not compile:
///
/// ```compile_fail,E0063
/// use std::sync::Arc;
/// use rpc_registry::{Implementation, RequestContext, Rpc, rpc_group};
///
/// pub struct Ping;
///
/// impl Rpc for Ping {
///     const NAME: &'static str = "Ping";
///     type Payload = String;
///     type Success = String;
///     type Failure = String;
/// }
///
/// pub struct Echo;
///
/// impl Rpc for Echo {
///     const NAME: &'static str = "Echo";
///     type Payload = String;
///     type Success = String;
///     type Failure = String;
/// }
///
/// rpc_group! {
///     pub struct Pinger {
///         ping: Ping,
///         echo: Echo,
///     }
///     pub struct PingerHandlers;
/// }
///
/// async fn reply(payload: String, _deps: Arc<()>, _ctx: RequestContext) -> Result<String, String> {
///     Ok(payload)
/// }
///
/// let handlers: PingerHandlers<()> = PingerHandlers {
///     ping: Implementation::new(reply),
/// };
/// ```
#[macro_export]
macro_rules! rpc_group {
    (
        $(#[$meta:meta])*
        $vis:vis struct $group:ident {
            $($field:ident : $rpc:ty),+ $(,)?
        }
        $(#[$handlers_meta:meta])*
        $handlers_vis:vis struct $handlers:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $group;

        $(#[$handlers_meta])*
        $handlers_vis struct $handlers<D> {
            $(pub $field: $crate::Implementation<$rpc, D>,)*
        }

        impl $crate::RpcGroup for $group {
            const NAME: &'static str = stringify!($group);
            type Handlers<D: Send + Sync + 'static> = $handlers<D>;

            fn requests() -> &'static [$crate::RequestDescriptor] {
                const REQUESTS: &[$crate::RequestDescriptor] =
                    &[$($crate::RequestDescriptor::of::<$rpc>()),*];
                REQUESTS
            }
        }

        $(impl $crate::Contains<$rpc> for $group {})*

        impl<D: Send + Sync + 'static> ::core::convert::From<$handlers<D>>
            for $crate::Implementations<$group, D>
        {
            fn from(handlers: $handlers<D>) -> Self {
                Self::new()$(.with(handlers.$field))*
            }
        }
    };
}
