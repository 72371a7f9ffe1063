//! Registries mapping tags to request groups.
//!
//! Two flavours share the same entry type:
//! - [`Registry`]: a persistent value. Registering returns a new registry and
//!   leaves the old one untouched, so it can be threaded through start-up code.
//! - the process-wide registry ([`register_handler`] / [`get_handler`]): a
//!   shared map for code that cannot thread a value around. Registration is an
//!   atomic check-and-insert.
//!
//! [`RpcTag`] pairs a tag name with its group type so typed lookups cannot
//! drift from registrations.

mod global;
mod scoped;
mod tag;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::accessor::TaggedAccessor;
use crate::error::RegistryError;
use crate::group::{RequestDescriptor, RpcGroup};

pub use global::{get_handler, handler_tags, has_handler, register_handler};
pub use scoped::Registry;
pub use tag::RpcTag;

/// One tag-to-group association.
#[derive(Clone)]
pub(crate) struct RegistryEntry {
    tag: Arc<str>,
    group: Arc<dyn Any + Send + Sync>,
    group_name: &'static str,
    requests: &'static [RequestDescriptor],
}

impl RegistryEntry {
    pub fn new<G: RpcGroup>(tag: Arc<str>, group: G) -> Self {
        Self {
            tag,
            group: Arc::new(group),
            group_name: G::NAME,
            requests: G::requests(),
        }
    }

    pub fn group_name(&self) -> &'static str {
        self.group_name
    }

    pub fn requests(&self) -> &'static [RequestDescriptor] {
        self.requests
    }

    /// Build a typed accessor, failing if the entry holds another group type.
    pub fn accessor<G: RpcGroup>(&self) -> Result<TaggedAccessor<G>, RegistryError> {
        let group = Arc::clone(&self.group)
            .downcast::<G>()
            .map_err(|_| RegistryError::GroupMismatch {
                tag: self.tag.to_string(),
                registered: self.group_name,
                requested: G::NAME,
            })?;

        Ok(TaggedAccessor::new(Arc::clone(&self.tag), group))
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("tag", &self.tag)
            .field("group", &self.group_name)
            .finish()
    }
}

/// Validate a tag and convert it to its shared form.
pub(crate) fn validate_tag(tag: String) -> Result<Arc<str>, RegistryError> {
    if tag.is_empty() {
        return Err(RegistryError::EmptyTag);
    }
    Ok(Arc::from(tag))
}
