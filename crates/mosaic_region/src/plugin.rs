//! Plugin registry
//!
//! A plugin is a named, reusable bundle of listeners. Regions opt in by
//! name; applying a plugin installs its action list on the region's bus.
//! First registration of a name wins.

use crate::config::ActionMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named listener bundle.
#[derive(Clone, Default)]
pub struct Plugin {
    /// Listeners installed when the plugin is applied, in order.
    pub actions: ActionMap,
}

impl Plugin {
    /// Plugin from an action map.
    pub fn new(actions: ActionMap) -> Self {
        Self { actions }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("actions", &self.actions)
            .finish()
    }
}

/// Name → plugin registry.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<Plugin>>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under a name. A name already taken keeps its
    /// original plugin.
    pub fn set(&self, name: impl Into<String>, plugin: Plugin) {
        let name = name.into();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            log::debug!("plugin '{}' already registered, keeping original", name);
            return;
        }
        plugins.insert(name, Arc::new(plugin));
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.plugins.read().get(name).cloned()
    }

    /// Whether the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::Message;

    #[test]
    fn test_first_registration_wins() {
        let registry = PluginRegistry::new();
        registry.set(
            "shortcuts",
            Plugin::new(ActionMap::new().with("key:keydown", Arc::new(|_: &mut Message| {}))),
        );
        registry.set("shortcuts", Plugin::new(ActionMap::new()));

        let plugin = registry.get("shortcuts").unwrap();
        assert_eq!(plugin.actions.len(), 1);
    }

    #[test]
    fn test_unknown_plugin() {
        let registry = PluginRegistry::new();
        assert!(!registry.contains("missing"));
        assert!(registry.get("missing").is_none());
    }
}
