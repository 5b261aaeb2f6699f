//! Region instances
//!
//! A live region: one node of the page tree, owning its container element,
//! its listener table and the bookkeeping for its declared children.
//! Instances are created by the runtime context once their definition
//! resolves, and move through a small state machine:
//!
//! ```text
//! Created → LoadingDeps → WaitingDom → Ready → Destroyed
//! ```
//!
//! `LoadingDeps` and `WaitingDom` are skipped when already satisfied.

use crate::config::RegionConfig;
use crate::context::RegionHandle;
use mosaic_core::{ElementHandle, Message, Namespace, RegionGuid, RegionListener};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle state of a region instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Constructed, dependencies not yet requested.
    Created,
    /// Waiting on the load queue.
    LoadingDeps,
    /// Dependencies ready, waiting for the container element.
    WaitingDom,
    /// Container bound, listeners installed, children live.
    Ready,
    /// Torn down and removed from the tree.
    Destroyed,
}

/// Capability set shared by all instances of a definition.
///
/// Composed into each instance at creation time — instances never share
/// mutable state through their definition. The default hooks do nothing;
/// definitions override the seams they care about.
pub trait RegionBehavior: Send + Sync {
    /// Called after construction, before dependency loading starts.
    fn on_init(&self, _region: &RegionHandle<'_>) {}

    /// Called once the region is ready, after `region:ready` listeners are
    /// installed but before the message fires.
    fn on_ready(&self, _region: &RegionHandle<'_>) {}

    /// Called as the region begins tearing down, after `region:destroy`
    /// fires.
    fn on_destroy(&self, _region: &RegionHandle<'_>) {}
}

/// The generic region capability set: all hooks default.
pub struct GenericBehavior;

impl RegionBehavior for GenericBehavior {}

/// A declared child slot on a parent region.
#[derive(Clone)]
pub struct ChildEntry {
    /// Configuration the child initializes with.
    pub config: RegionConfig,
    /// Dormant until an explicit wake.
    pub lazy: bool,
    /// The child reached ready and registered back.
    pub live: bool,
}

/// A live region instance.
pub struct RegionInstance {
    guid: RegionGuid,
    config: RegionConfig,
    behavior: Arc<dyn RegionBehavior>,
    state: RwLock<RegionState>,
    parent: RwLock<Option<RegionGuid>>,
    children: RwLock<Vec<(RegionGuid, ChildEntry)>>,
    listeners: RwLock<HashMap<String, Vec<RegionListener>>>,
    container: RwLock<Option<ElementHandle>>,
}

impl RegionInstance {
    /// Create an instance from its merged configuration, declaring the
    /// configured children as dormant slots.
    pub(crate) fn new(
        guid: RegionGuid,
        config: RegionConfig,
        behavior: Arc<dyn RegionBehavior>,
    ) -> Arc<Self> {
        let children = config
            .children
            .iter()
            .map(|(child_guid, child_config)| {
                let lazy = child_config.lazyload;
                (
                    child_guid.clone(),
                    ChildEntry {
                        config: child_config.clone(),
                        lazy,
                        live: false,
                    },
                )
            })
            .collect();
        let parent = config.parent.clone();
        Arc::new(Self {
            guid,
            config,
            behavior,
            state: RwLock::new(RegionState::Created),
            parent: RwLock::new(parent),
            children: RwLock::new(children),
            listeners: RwLock::new(HashMap::new()),
            container: RwLock::new(None),
        })
    }

    /// The instance's unique id.
    pub fn guid(&self) -> &RegionGuid {
        &self.guid
    }

    /// The definition namespace.
    pub fn ns(&self) -> &Namespace {
        &self.config.ns
    }

    /// The merged configuration.
    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// The capability object.
    pub(crate) fn behavior(&self) -> &Arc<dyn RegionBehavior> {
        &self.behavior
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: RegionState) {
        log::debug!("region '{}': {:?}", self.guid, state);
        *self.state.write() = state;
    }

    /// Whether the region reached ready.
    pub fn is_ready(&self) -> bool {
        self.state() == RegionState::Ready
    }

    /// The owning region's guid, when there is one.
    pub fn parent(&self) -> Option<RegionGuid> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Option<RegionGuid>) {
        *self.parent.write() = parent;
    }

    /// The bound container element, once acquired.
    pub fn container(&self) -> Option<ElementHandle> {
        *self.container.read()
    }

    pub(crate) fn bind_container(&self, el: ElementHandle) {
        *self.container.write() = Some(el);
    }

    // ---- messaging ----------------------------------------------------

    /// Subscribe a listener to a layer. The layer's subscriber list is
    /// created on first use; firing order is registration order.
    pub fn on(&self, layer: impl Into<String>, listener: RegionListener) {
        self.listeners
            .write()
            .entry(layer.into())
            .or_default()
            .push(listener);
    }

    /// Fire a layer locally and synchronously.
    ///
    /// Returns the message's flagged bit, unchanged when the layer has no
    /// subscribers. The listener list is snapshotted first, so a listener
    /// registering further listeners does not affect the current pass.
    pub fn fire(&self, layer: &str, msg: &mut Message) -> bool {
        let snapshot: Vec<RegionListener> = self
            .listeners
            .read()
            .get(layer)
            .cloned()
            .unwrap_or_default();
        msg.layer = layer.to_string();
        for listener in snapshot {
            listener(msg);
        }
        msg.flagged
    }

    /// Number of listeners on a layer.
    pub fn listener_count(&self, layer: &str) -> usize {
        self.listeners.read().get(layer).map_or(0, Vec::len)
    }

    // ---- children -----------------------------------------------------

    /// Declared children with their configurations and lazy flags, in
    /// declaration order.
    pub(crate) fn declared_children(&self) -> Vec<(RegionGuid, RegionConfig, bool)> {
        self.children
            .read()
            .iter()
            .map(|(guid, entry)| (guid.clone(), entry.config.clone(), entry.lazy))
            .collect()
    }

    /// Children that are live and not dormant, in declaration order. These
    /// are the broadcast and trickling targets.
    pub fn live_children(&self) -> Vec<RegionGuid> {
        self.children
            .read()
            .iter()
            .filter(|(_, entry)| entry.live && !entry.lazy)
            .map(|(guid, _)| guid.clone())
            .collect()
    }

    /// The configuration of a dormant lazy child, if the guid names one.
    pub(crate) fn dormant_child(&self, guid: &RegionGuid) -> Option<RegionConfig> {
        self.children
            .read()
            .iter()
            .find(|(child_guid, entry)| child_guid == guid && entry.lazy && !entry.live)
            .map(|(_, entry)| entry.config.clone())
    }

    /// Clear a child's lazy flag once it has been woken.
    pub(crate) fn mark_child_woken(&self, guid: &RegionGuid) {
        if let Some((_, entry)) = self
            .children
            .write()
            .iter_mut()
            .find(|(child_guid, _)| child_guid == guid)
        {
            entry.lazy = false;
        }
    }

    /// Record a child as live. Creates the slot when the child was not
    /// declared up front (regions attached at runtime).
    pub(crate) fn set_child_live(&self, guid: &RegionGuid) {
        let mut children = self.children.write();
        if let Some((_, entry)) = children
            .iter_mut()
            .find(|(child_guid, _)| child_guid == guid)
        {
            entry.live = true;
            entry.lazy = false;
        } else {
            children.push((
                guid.clone(),
                ChildEntry {
                    config: RegionConfig::default(),
                    lazy: false,
                    live: true,
                },
            ));
        }
    }

    /// Whether the guid names a declared or live child.
    pub fn has_child(&self, guid: &RegionGuid) -> bool {
        self.children
            .read()
            .iter()
            .any(|(child_guid, _)| child_guid == guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn instance(guid: &str) -> Arc<RegionInstance> {
        RegionInstance::new(
            RegionGuid::from(guid),
            RegionConfig::new("test"),
            Arc::new(GenericBehavior),
        )
    }

    #[test]
    fn test_fire_without_subscribers_is_noop() {
        let region = instance("solo");
        let mut msg = Message::empty();
        assert!(!region.fire("region:ready", &mut msg));
        msg.flag();
        assert!(region.fire("region:ready", &mut msg));
    }

    #[test]
    fn test_fire_in_registration_order() {
        let region = instance("ordered");
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            region.on(
                "click:click",
                Arc::new(move |_: &mut Message| seen.lock().push(i)),
            );
        }
        region.fire("click:click", &mut Message::empty());
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fire_sets_layer() {
        let region = instance("layered");
        let seen: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        region.on(
            "region:ready",
            Arc::new(move |msg: &mut Message| {
                *sink.lock() = msg.layer.clone();
            }),
        );
        region.fire("region:ready", &mut Message::empty());
        assert_eq!(*seen.lock(), "region:ready");
    }

    #[test]
    fn test_declared_children_lifecycle() {
        let lazy_child = RegionConfig {
            lazyload: true,
            ..RegionConfig::new("widget")
        };
        let eager_child = RegionConfig::new("widget");
        let config = RegionConfig {
            children: vec![
                (RegionGuid::from("c1"), lazy_child),
                (RegionGuid::from("c2"), eager_child),
            ],
            ..RegionConfig::new("panel")
        };
        let region = RegionInstance::new(
            RegionGuid::from("p"),
            config,
            Arc::new(GenericBehavior),
        );

        assert!(region.live_children().is_empty());
        assert!(region.dormant_child(&RegionGuid::from("c1")).is_some());
        assert!(region.dormant_child(&RegionGuid::from("c2")).is_none());

        region.set_child_live(&RegionGuid::from("c2"));
        let live: Vec<_> = region.live_children();
        assert_eq!(live, vec![RegionGuid::from("c2")]);

        // waking c1 clears the lazy flag; it goes live once ready
        region.mark_child_woken(&RegionGuid::from("c1"));
        assert!(region.dormant_child(&RegionGuid::from("c1")).is_none());
        region.set_child_live(&RegionGuid::from("c1"));
        assert_eq!(region.live_children().len(), 2);
    }

    #[test]
    fn test_runtime_attached_child() {
        let region = instance("p");
        region.set_child_live(&RegionGuid::from("late"));
        assert!(region.has_child(&RegionGuid::from("late")));
        assert_eq!(region.live_children(), vec![RegionGuid::from("late")]);
    }
}
