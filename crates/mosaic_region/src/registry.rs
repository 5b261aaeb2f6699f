//! Region definition registry
//!
//! Maps a namespace to its lazily-resolved definition. Instances may
//! subscribe before the definition exists; the first subscription triggers
//! an on-demand fetch of the definition source, and every pending
//! subscriber is constructed once the definition lands.
//!
//! Pending subscribers drain in stack order (last subscribed, first
//! notified). That ordering is inherited behavior and pinned by a test;
//! see DESIGN notes before changing it.

use crate::config::RegionConfig;
use crate::instance::{GenericBehavior, RegionBehavior};
use mosaic_core::{Namespace, RegionGuid};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The payload of a definition registration.
#[derive(Default)]
pub struct DefinitionBody {
    /// Capability object shared by all instances of the namespace. When
    /// absent, the generic region capability set is used.
    pub behavior: Option<Arc<dyn RegionBehavior>>,
    /// Defaults merged under each instance's own configuration.
    pub defaults: RegionConfig,
}

impl DefinitionBody {
    /// Body with the given behavior and default configuration.
    pub fn new(behavior: Arc<dyn RegionBehavior>, defaults: RegionConfig) -> Self {
        Self {
            behavior: Some(behavior),
            defaults,
        }
    }

    /// Body carrying only default configuration.
    pub fn defaults(defaults: RegionConfig) -> Self {
        Self {
            behavior: None,
            defaults,
        }
    }
}

/// A resolved region definition. Immutable once set; shared by every
/// instance created from it.
pub struct RegionDefinition {
    pub ns: Namespace,
    pub behavior: Arc<dyn RegionBehavior>,
    pub defaults: RegionConfig,
}

impl fmt::Debug for RegionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionDefinition")
            .field("ns", &self.ns)
            .finish()
    }
}

/// An instance waiting for its definition.
#[derive(Debug, Clone)]
pub struct PendingInstance {
    pub guid: RegionGuid,
    pub config: RegionConfig,
}

/// What the caller must do after a subscription.
#[derive(Debug)]
pub enum SubscribeAction {
    /// The definition is resolved; construct these instances now, in the
    /// returned order.
    Notify(Vec<PendingInstance>),
    /// First subscriber for the namespace: fetch the definition source.
    Fetch(String),
    /// A fetch is already under way; nothing to do.
    Wait,
}

struct LoaderEntry {
    definition: Option<Arc<RegionDefinition>>,
    pending: Vec<PendingInstance>,
}

impl LoaderEntry {
    fn new() -> Self {
        Self {
            definition: None,
            pending: Vec::new(),
        }
    }

    /// Drain pending subscribers, last-subscribed first.
    fn drain_pending(&mut self) -> Vec<PendingInstance> {
        let mut drained = Vec::with_capacity(self.pending.len());
        while let Some(pending) = self.pending.pop() {
            drained.push(pending);
        }
        drained
    }
}

/// Namespace → definition registry.
#[derive(Default)]
pub struct DefinitionRegistry {
    entries: Mutex<HashMap<Namespace, LoaderEntry>>,
}

impl DefinitionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition for the namespace. With no body, only the
    /// loader entry is created. Returns the subscribers to construct, in
    /// notification order.
    pub fn set_definition(
        &self,
        ns: &Namespace,
        body: Option<DefinitionBody>,
    ) -> Vec<PendingInstance> {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(ns.clone())
            .or_insert_with(LoaderEntry::new);

        let Some(body) = body else {
            return Vec::new();
        };
        if entry.definition.is_some() {
            log::warn!("definition for '{}' already set, ignoring", ns);
            return Vec::new();
        }

        let mut defaults = body.defaults;
        defaults.ns = ns.clone();
        entry.definition = Some(Arc::new(RegionDefinition {
            ns: ns.clone(),
            behavior: body
                .behavior
                .unwrap_or_else(|| Arc::new(GenericBehavior)),
            defaults,
        }));
        log::info!("definition for '{}' resolved", ns);
        entry.drain_pending()
    }

    /// Subscribe an instance configuration to the namespace.
    pub fn subscribe(
        &self,
        ns: &Namespace,
        pending: PendingInstance,
        source: Option<&str>,
    ) -> SubscribeAction {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(ns) {
            entry.pending.push(pending);
            return if entry.definition.is_some() {
                SubscribeAction::Notify(entry.drain_pending())
            } else {
                SubscribeAction::Wait
            };
        }

        let mut entry = LoaderEntry::new();
        entry.pending.push(pending);
        match source {
            Some(url) => {
                entries.insert(ns.clone(), entry);
                SubscribeAction::Fetch(url.to_string())
            }
            None => {
                // inline region: nothing to fetch, resolve with the
                // generic capability set
                entry.definition = Some(Arc::new(RegionDefinition {
                    ns: ns.clone(),
                    behavior: Arc::new(GenericBehavior),
                    defaults: RegionConfig::new(ns.clone()),
                }));
                let drained = entry.drain_pending();
                entries.insert(ns.clone(), entry);
                SubscribeAction::Notify(drained)
            }
        }
    }

    /// The resolved definition for the namespace, if any.
    pub fn definition(&self, ns: &Namespace) -> Option<Arc<RegionDefinition>> {
        self.entries
            .lock()
            .get(ns)
            .and_then(|entry| entry.definition.clone())
    }

    /// Whether a loader entry exists for the namespace (resolved or not).
    pub fn is_registered(&self, ns: &Namespace) -> bool {
        self.entries.lock().contains_key(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(guid: &str) -> PendingInstance {
        PendingInstance {
            guid: RegionGuid::from(guid),
            config: RegionConfig::new("news"),
        }
    }

    #[test]
    fn test_subscribe_before_definition_waits() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("news");

        let action = registry.subscribe(&ns, pending("panelA"), Some("news.js"));
        assert!(matches!(action, SubscribeAction::Fetch(ref url) if url == "news.js"));
        assert!(registry.is_registered(&ns));
        assert!(registry.definition(&ns).is_none());

        // second subscriber piles onto the fetch already under way
        let action = registry.subscribe(&ns, pending("panelB"), Some("news.js"));
        assert!(matches!(action, SubscribeAction::Wait));
    }

    #[test]
    fn test_resolution_notifies_lifo() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("news");

        registry.subscribe(&ns, pending("panelA"), Some("news.js"));
        registry.subscribe(&ns, pending("panelB"), Some("news.js"));

        let notified = registry.set_definition(&ns, Some(DefinitionBody::default()));
        let guids: Vec<_> = notified.iter().map(|p| p.guid.as_str()).collect();
        // stack drain: last subscribed, first notified
        assert_eq!(guids, vec!["panelB", "panelA"]);
    }

    #[test]
    fn test_subscribe_after_resolution_notifies_synchronously() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("news");
        registry.set_definition(&ns, Some(DefinitionBody::default()));

        let action = registry.subscribe(&ns, pending("panelA"), Some("news.js"));
        match action {
            SubscribeAction::Notify(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].guid.as_str(), "panelA");
            }
            other => panic!("expected Notify, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_region_resolves_without_fetch() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("inline");

        let action = registry.subscribe(&ns, pending("box1"), None);
        assert!(matches!(action, SubscribeAction::Notify(ref list) if list.len() == 1));
        assert!(registry.definition(&ns).is_some());
    }

    #[test]
    fn test_definition_immutable_once_set() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("news");

        registry.set_definition(
            &ns,
            Some(DefinitionBody::defaults(RegionConfig {
                require: vec!["anim".to_string()],
                ..RegionConfig::default()
            })),
        );
        // second registration is ignored
        let notified = registry.set_definition(
            &ns,
            Some(DefinitionBody::defaults(RegionConfig {
                require: vec!["drag".to_string()],
                ..RegionConfig::default()
            })),
        );
        assert!(notified.is_empty());

        let definition = registry.definition(&ns).unwrap();
        assert_eq!(definition.defaults.require, vec!["anim"]);
    }

    #[test]
    fn test_set_without_body_only_registers() {
        let registry = DefinitionRegistry::new();
        let ns = Namespace::from("later");
        registry.set_definition(&ns, None);
        assert!(registry.is_registered(&ns));
        assert!(registry.definition(&ns).is_none());
    }
}
