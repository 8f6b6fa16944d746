use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::schema::{JsonSchemaProvider, SchemaProvider, ShorthandProvider};

/// Name → provider lookup used by resolvers.
///
/// Registration is expected at start-up; afterwards the registry is only
/// read. Lookups of unknown names fail instead of falling back to a default.
#[derive(Default)]
pub struct SchemaProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn SchemaProvider>>>,
}

impl SchemaProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_providers() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(JsonSchemaProvider));
        registry.register(Arc::new(ShorthandProvider));
        registry
    }

    /// Registers `provider` under its own name, replacing any previous entry.
    pub fn register(&self, provider: Arc<dyn SchemaProvider>) {
        let name = provider.name().to_owned();
        self.register_as(name, provider);
    }

    pub fn register_as(&self, name: impl Into<String>, provider: Arc<dyn SchemaProvider>) {
        let name = name.into();
        tracing::debug!(provider = %name, "registering schema provider");
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SchemaProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::AdapterNotRegistered(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Process-wide registry, pre-populated with the built-in providers.
pub fn global() -> Arc<SchemaProviderRegistry> {
    static GLOBAL: OnceLock<Arc<SchemaProviderRegistry>> = OnceLock::new();
    GLOBAL
        .get_or_init(|| Arc::new(SchemaProviderRegistry::with_builtin_providers()))
        .clone()
}
