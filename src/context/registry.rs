use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::DatabaseContextProvider;
use crate::dialect::{normalize_dialect, Dialect};

/// Registry of context providers keyed by normalized dialect id.
///
/// Registering an id that is already present replaces the provider.
#[derive(Default)]
pub struct DatabaseContextRegistry {
    providers: HashMap<String, Arc<dyn DatabaseContextProvider>>,
}

impl DatabaseContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in provider of every known dialect.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        for dialect in Dialect::ALL {
            registry.register(dialect.id(), dialect.context_provider());
        }
        registry
    }

    pub fn register(&mut self, dialect: &str, provider: Arc<dyn DatabaseContextProvider>) {
        self.providers.insert(normalize_dialect(dialect), provider);
    }

    pub fn get(&self, dialect: &str) -> Option<Arc<dyn DatabaseContextProvider>> {
        self.providers.get(&normalize_dialect(dialect)).cloned()
    }

    /// Provider for `dialect`, falling back to the `default` entry and then
    /// to the built-in generic provider.
    pub fn get_or_default(&self, dialect: &str) -> Arc<dyn DatabaseContextProvider> {
        self.get(dialect)
            .or_else(|| self.get(Dialect::Default.id()))
            .unwrap_or_else(|| Dialect::Default.context_provider())
    }

    pub fn has(&self, dialect: &str) -> bool {
        self.providers.contains_key(&normalize_dialect(dialect))
    }

    /// Registered dialect ids, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.providers.keys().cloned().collect();
        types.sort();
        types
    }
}

static REGISTRY: Lazy<RwLock<DatabaseContextRegistry>> =
    Lazy::new(|| RwLock::new(DatabaseContextRegistry::with_builtin_providers()));

/// Add or replace a provider in the process-wide registry.
pub fn register_context_provider(dialect: &str, provider: Arc<dyn DatabaseContextProvider>) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(dialect, provider);
}

/// Provider for `dialect` from the process-wide registry. Unknown dialects
/// resolve to the generic provider.
pub fn context_provider(dialect: &str) -> Arc<dyn DatabaseContextProvider> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_default(dialect)
}

pub fn supported_context_types() -> Vec<String> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .supported_types()
}
