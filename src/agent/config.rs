//! Agent configuration: version-tagged store names and the precache manifest.
//!
//! This is the entire configuration surface. Store names carry the cache
//! version, so bumping the version yields fresh store names and makes every
//! older store stale by name comparison alone.

use super::manifest::PrecacheManifest;

/// Compiled-in configuration for one agent version.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name of the static store, e.g. "larder-static-v3"
    pub static_store: String,
    /// Name of the dynamic store, e.g. "larder-dynamic-v3"
    pub dynamic_store: String,
    /// URLs precached into the static store at install
    pub precache: PrecacheManifest,
}

impl AgentConfig {
    /// Build a config whose store names carry the given cache version.
    pub fn versioned(app: &str, version: u32, precache: PrecacheManifest) -> Self {
        Self {
            static_store: format!("{app}-static-v{version}"),
            dynamic_store: format!("{app}-dynamic-v{version}"),
            precache,
        }
    }

    /// Whether a store name belongs to this version. Anything else found in
    /// the cache database is stale and gets removed at activation.
    pub fn is_current(&self, store_name: &str) -> bool {
        store_name == self.static_store || store_name == self.dynamic_store
    }
}
