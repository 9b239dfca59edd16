//! Logical collection names and the remote resources behind them.

use std::collections::HashMap;

/// Static mapping from the collection names callers use to the resource
/// names the remote store exposes.
///
/// Several logical names may share one resource. Unknown names resolve to
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    aliases: HashMap<String, String>,
    collections: Vec<String>,
}

impl TableRegistry {
    /// Create an empty registry (every name resolves to itself).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for the back-office forms: clients, fleet, staff, and trips.
    pub fn with_defaults() -> Self {
        Self::new()
            .register("clients", "clients")
            .alias("customers", "clients")
            .register("vehicles", "vehicles")
            .register("staff", "staff")
            .alias("drivers", "staff")
            .register("manifests", "manifests")
            .register("trips", "trips")
            .register("branches", "branches")
    }

    /// Register a collection that takes part in full syncs.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, resource: impl Into<String>) -> Self {
        let name = name.into();
        if !self.collections.contains(&name) {
            self.collections.push(name.clone());
        }
        self.aliases.insert(name, resource.into());
        self
    }

    /// Add a name that resolves to `resource` without being synced on its own.
    ///
    /// An alias keeps its own cache entry. Writes through the alias settle
    /// only that entry, so the primary collection's cached copy stays as it
    /// was until its next load.
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>, resource: impl Into<String>) -> Self {
        self.aliases.insert(name.into(), resource.into());
        self
    }

    /// Remote resource for `name`.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Collections visited by a full sync, in registration order.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Every known logical name with its resource, sorted by name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries = self
            .aliases
            .iter()
            .map(|(name, resource)| (name.as_str(), resource.as_str()))
            .collect::<Vec<_>>();
        entries.sort_unstable();
        entries
    }
}
