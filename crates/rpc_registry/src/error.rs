use thiserror::Error;
use tonic::Status;

/// Errors raised by registry operations, scoped or process-wide.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// Tags must be non-empty identifiers.
    #[error("registry tag must not be empty")]
    EmptyTag,

    /// The tag is already present in this registry.
    #[error("tag '{0}' is already registered")]
    DuplicateTag(String),

    /// No group is registered under the tag.
    #[error("no request group registered under tag '{0}'")]
    UnknownTag(String),

    /// The tag exists but was registered with a different group type.
    #[error("tag '{tag}' holds group '{registered}', not '{requested}'")]
    GroupMismatch {
        tag: String,
        registered: &'static str,
        requested: &'static str,
    },
}

/// Errors surfaced when running a deferred request.
///
/// `E` is the declared failure type of the request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcError<E> {
    /// The implementation returned its declared failure.
    #[error("request failed: {0:?}")]
    Failure(E),

    /// The constructed client has no method with this name.
    #[error("request '{name}' is not declared by group '{group}'")]
    UnknownRequest {
        group: &'static str,
        name: &'static str,
    },

    /// The protocol failed to deliver the request or its response.
    #[error(transparent)]
    Transport(#[from] Status),

    /// A response could not be decoded.
    #[error("protobuf decode error")]
    Decode(#[from] prost::DecodeError),

    /// The response envelope carried neither a success nor a failure.
    #[error("response envelope has no outcome")]
    MalformedExit,
}

impl<E> RpcError<E> {
    /// Returns the declared failure, if that is what this error is.
    pub fn failure(&self) -> Option<&E> {
        match self {
            RpcError::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the declared failure, if any.
    pub fn into_failure(self) -> Option<E> {
        match self {
            RpcError::Failure(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors that can occur while building a server handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServerError {
    /// A declared request has no implementation.
    #[error("group '{group}' declares '{name}' but no implementation was provided")]
    MissingImplementation {
        group: &'static str,
        name: &'static str,
    },

    /// An implementation was provided for a name the group does not declare.
    #[error("group '{group}' does not declare '{name}'")]
    UnexpectedImplementation {
        group: &'static str,
        name: &'static str,
    },

    /// The same request was implemented more than once.
    #[error("request '{name}' of group '{group}' was implemented more than once")]
    DuplicateImplementation {
        group: &'static str,
        name: &'static str,
    },

    /// The group declares two requests with the same name.
    #[error("group '{group}' declares request '{name}' more than once")]
    DuplicateRequest {
        group: &'static str,
        name: &'static str,
    },
}
