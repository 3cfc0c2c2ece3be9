//! Registry of backend factories, looked up by name.
//!
//! The registry is an explicit value owned by the application rather than
//! process-global state. Factories are shared with the hashes created from
//! them, so dropping the registry only releases factories no live hash uses.

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::factory::{Factory, HashFactory};
use crate::hash::Hash;
use crate::memory::MemoryFactory;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Default)]
pub struct HashRegistry {
    // Registration order; the last entry is the default factory.
    factories: Vec<Rc<Factory>>,
    by_name: HashMap<String, usize>,
}

impl HashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the in-memory backend registered as `"memory"`.
    pub fn with_defaults(config: MemoryConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register("memory", MemoryFactory::new(config)?);
        Ok(registry)
    }

    /// Add a backend under `name`. It becomes the default factory.
    ///
    /// # Panics
    ///
    /// If a factory is already registered under `name`.
    pub fn register(&mut self, name: &str, factory: impl HashFactory + 'static) {
        assert!(
            !self.by_name.contains_key(name),
            "hash factory `{}` registered twice",
            name
        );
        let factory = Factory::new(name, factory);
        debug!(
            factory = name,
            context_length = factory.context_length(),
            cursor_context_length = factory.cursor_context_length(),
            "registered hash factory"
        );
        self.by_name.insert(name.to_owned(), self.factories.len());
        self.factories.push(Rc::new(factory));
    }

    /// The factory called `name`, or the default factory for `None`.
    pub fn lookup(&self, name: Option<&str>) -> Option<Rc<Factory>> {
        let factory = match name {
            Some(name) => self.factories.get(*self.by_name.get(name)?)?,
            None => self.factories.last()?,
        };
        Some(Rc::clone(factory))
    }

    /// Create an unopened hash from the named (or default) factory.
    ///
    /// `None` when no such factory is registered.
    pub fn new_hash(&self, name: Option<&str>) -> Option<Result<Hash>> {
        self.lookup(name).map(Hash::new)
    }

    /// Registered names, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl core::fmt::Debug for HashRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
