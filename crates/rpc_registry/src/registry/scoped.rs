use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::accessor::TaggedAccessor;
use crate::error::RegistryError;
use crate::group::{RequestDescriptor, RpcGroup};
use crate::registry::{RegistryEntry, validate_tag};

type Entries = HashMap<Arc<str>, RegistryEntry, ahash::RandomState>;

/// A persistent registry of request groups.
///
/// Registering returns a new registry containing every prior entry plus the
/// new one. The registry it was called on is left unchanged, so values
/// captured earlier never observe later registrations.
///
/// # Example
/// ```ignore
/// let registry = Registry::new()
///     .register("greeter", Greeter)?
///     .register("billing", Billing)?;
///
/// let greeter = registry.get::<Greeter>("greeter")?;
/// let reply = greeter
///     .request::<SayHelloReq>(SayHello { name: "Ben".into() })
///     .run(&protocol)
///     .await?;
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Entries>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new registry with `group` registered under `tag`.
    ///
    /// Fails if the tag is empty or already present.
    pub fn register<G: RpcGroup>(
        &self,
        tag: impl Into<String>,
        group: G,
    ) -> Result<Registry, RegistryError> {
        let tag = validate_tag(tag.into())?;

        if let Some(existing) = self.entries.get(&tag) {
            warn!(
                tag = %tag,
                registered = existing.group_name(),
                group = G::NAME,
                "Tag already registered"
            );
            return Err(RegistryError::DuplicateTag(tag.to_string()));
        }

        let mut entries = Entries::clone(&self.entries);
        entries.insert(Arc::clone(&tag), RegistryEntry::new(Arc::clone(&tag), group));

        info!(tag = %tag, group = G::NAME, "Registered request group");

        Ok(Registry {
            entries: Arc::new(entries),
        })
    }

    /// Register, then immediately look the new entry up.
    pub fn register_and_get<G: RpcGroup>(
        &self,
        tag: impl Into<String>,
        group: G,
    ) -> Result<(Registry, TaggedAccessor<G>), RegistryError> {
        let tag = tag.into();
        let registry = self.register(tag.as_str(), group)?;
        let accessor = registry.get::<G>(&tag)?;
        Ok((registry, accessor))
    }

    /// Look up the accessor for `tag`.
    ///
    /// Fails if the tag is absent or holds a group other than `G`.
    pub fn get<G: RpcGroup>(&self, tag: &str) -> Result<TaggedAccessor<G>, RegistryError> {
        self.entries
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?
            .accessor::<G>()
    }

    pub fn has(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// All registered tags, sorted.
    pub fn list_tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.entries.keys().map(|tag| tag.to_string()).collect();
        tags.sort_unstable();
        tags
    }

    /// Request descriptors of the group under `tag`, without naming its type.
    pub fn descriptors(&self, tag: &str) -> Result<&'static [RequestDescriptor], RegistryError> {
        self.entries
            .get(tag)
            .map(RegistryEntry::requests)
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.values()).finish()
    }
}
