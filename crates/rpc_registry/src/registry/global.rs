use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::accessor::TaggedAccessor;
use crate::error::RegistryError;
use crate::group::RpcGroup;
use crate::registry::{RegistryEntry, validate_tag};

/// Process-wide tag-to-group map.
///
/// Created on first use and never torn down. Only one entry may exist per tag;
/// the check and the insert happen under the same shard lock.
static HANDLERS: LazyLock<DashMap<Arc<str>, RegistryEntry, ahash::RandomState>> =
    LazyLock::new(DashMap::default);

/// Register `group` under `tag` in the process-wide registry.
///
/// Returns the accessor for the new entry. Fails if the tag is empty or
/// already registered, even when two threads race on the same tag.
pub fn register_handler<G: RpcGroup>(
    tag: impl Into<String>,
    group: G,
) -> Result<TaggedAccessor<G>, RegistryError> {
    use dashmap::mapref::entry::Entry;

    let tag = validate_tag(tag.into())?;

    match HANDLERS.entry(Arc::clone(&tag)) {
        Entry::Occupied(slot) => {
            warn!(
                tag = %tag,
                registered = slot.get().group_name(),
                group = G::NAME,
                "Tag already registered in process-wide registry"
            );
            Err(RegistryError::DuplicateTag(tag.to_string()))
        }
        Entry::Vacant(slot) => {
            let entry = RegistryEntry::new(Arc::clone(&tag), group);
            let accessor = entry.accessor::<G>()?;
            slot.insert(entry);

            info!(tag = %tag, group = G::NAME, "Registered process-wide request group");
            Ok(accessor)
        }
    }
}

/// Look up the accessor for `tag` in the process-wide registry.
pub fn get_handler<G: RpcGroup>(tag: &str) -> Result<TaggedAccessor<G>, RegistryError> {
    HANDLERS
        .get(tag)
        .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?
        .accessor::<G>()
}

/// Check whether `tag` is registered process-wide.
pub fn has_handler(tag: &str) -> bool {
    HANDLERS.contains_key(tag)
}

/// Tags currently registered process-wide, sorted.
pub fn handler_tags() -> Vec<String> {
    let mut tags: Vec<_> = HANDLERS.iter().map(|entry| entry.key().to_string()).collect();
    tags.sort_unstable();
    tags
}
