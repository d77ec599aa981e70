//! Plugin-based provider registry
//!
//! The registry maps vendor names to factories, so the set of supported
//! vendors grows by registering crates rather than by editing a `match`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::{ProviderRegistry, RegexMatcher};
//! use std::sync::Arc;
//!
//! let registry = ProviderRegistry::new();
//! ddns_provider_namecheap::register(&registry);
//!
//! let matcher: Arc<dyn ddns_core::Matcher> = Arc::new(RegexMatcher::new());
//! let provider = registry.create_provider(&config, &matcher)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{Matcher, Provider, ProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Provider registry for plugin-based provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Box<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory under a vendor name
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let name = name.into();
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name, factory);
    }

    /// Create a validated provider from one settings entry
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Provider>)`: Ready-to-use provider
    /// - `Err(Error)`: Unknown vendor, or the vendor rejected the settings
    pub fn create_provider(
        &self,
        config: &ProviderConfig,
        matcher: &Arc<dyn Matcher>,
    ) -> Result<Box<dyn Provider>> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers
            .get(config.provider.as_str())
            .ok_or_else(|| Error::UnknownProvider(config.provider.clone()))?;

        factory.create(config, matcher)
    }

    /// List all registered vendor names, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a vendor name is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }
}
