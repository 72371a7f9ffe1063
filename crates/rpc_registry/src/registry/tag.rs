use std::fmt;
use std::marker::PhantomData;

use crate::accessor::TaggedAccessor;
use crate::error::RegistryError;
use crate::group::RpcGroup;
use crate::registry::{Registry, global};

/// A tag name bound to its group type.
///
/// Declared as a constant, it replaces string literals at call sites: a typo
/// becomes an unresolved name and a lookup with the wrong group type does not
/// compile.
///
/// ```ignore
/// const GREETER: RpcTag<Greeter> = RpcTag::new("greeter");
///
/// let registry = GREETER.register(&Registry::new(), Greeter)?;
/// let greeter = GREETER.get(&registry)?;
/// ```
pub struct RpcTag<G> {
    name: &'static str,
    _group: PhantomData<fn() -> G>,
}

impl<G> RpcTag<G> {
    /// # Panics
    ///
    /// Panics if `name` is empty. In a `const` item this is a compile error;
    /// called at runtime it panics. Pass runtime tag names to
    /// [`Registry::register`] instead, which returns
    /// [`RegistryError::EmptyTag`].
    pub const fn new(name: &'static str) -> Self {
        assert!(!name.is_empty(), "registry tag must not be empty");
        Self {
            name,
            _group: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<G: RpcGroup> RpcTag<G> {
    pub fn register(&self, registry: &Registry, group: G) -> Result<Registry, RegistryError> {
        registry.register(self.name, group)
    }

    pub fn register_and_get(
        &self,
        registry: &Registry,
        group: G,
    ) -> Result<(Registry, TaggedAccessor<G>), RegistryError> {
        registry.register_and_get(self.name, group)
    }

    pub fn get(&self, registry: &Registry) -> Result<TaggedAccessor<G>, RegistryError> {
        registry.get::<G>(self.name)
    }

    /// Register in the process-wide registry.
    pub fn register_handler(&self, group: G) -> Result<TaggedAccessor<G>, RegistryError> {
        global::register_handler(self.name, group)
    }

    /// Look up in the process-wide registry.
    pub fn get_handler(&self) -> Result<TaggedAccessor<G>, RegistryError> {
        global::get_handler::<G>(self.name)
    }
}

impl<G> Clone for RpcTag<G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G> Copy for RpcTag<G> {}

impl<G> fmt::Debug for RpcTag<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RpcTag").field(&self.name).finish()
    }
}

impl<G> fmt::Display for RpcTag<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
