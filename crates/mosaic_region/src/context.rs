//! The region runtime context
//!
//! One `RegionContext` owns everything a page needs: the instance tree,
//! the definition and plugin registries, the dependency cache, the load
//! queue and the collaborator adapters. Contexts are created explicitly
//! and torn down explicitly, so several independent trees can coexist in
//! one process (tests run dozens).
//!
//! ## Runtime model
//!
//! ```text
//! adapters ──completions──► event channel ──► pump() ──► state machines
//!                                                │
//!                                   fire / bubbling / broadcast
//!                                        (synchronous)
//! ```
//!
//! All I/O answers arrive as [`RuntimeEvent`]s on a channel and are
//! processed by [`RegionContext::pump`] on the embedder's thread. Bus
//! operations never suspend; the only suspension points are the adapter
//! boundaries (script fetch, AJAX, element waits).

use crate::bus;
use crate::config::{PageConfig, RegionConfig};
use crate::instance::{RegionInstance, RegionState};
use crate::plugin::{Plugin, PluginRegistry};
use crate::registry::{DefinitionBody, DefinitionRegistry, PendingInstance, SubscribeAction};
use crate::router;
use crossbeam_channel::{unbounded, Receiver, Sender};
use mosaic_core::message::AjaxEvent;
use mosaic_core::{
    AjaxAdapter, AjaxHandle, AjaxRequest, AjaxResponse, AjaxResult, Completion, DomAdapter,
    ElementHandle, HttpMethod, LoadOutcome, Message, MessageBody, Namespace, RawEvent,
    RegionError, RegionGuid, RegionListener, ScriptLoader, BASE_REQUIRES, DEFAULT_ROOT_GUID,
    REGION_MARKER_CLASS, ROOT_NAMESPACE,
};
use mosaic_loader::{DependencyCache, LoadKind, LoadQueue};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The collaborator set a context runs against.
#[derive(Clone)]
pub struct Adapters {
    pub script: Arc<dyn ScriptLoader>,
    pub dom: Arc<dyn DomAdapter>,
    pub ajax: Arc<dyn AjaxAdapter>,
}

/// An I/O completion routed back into the pump.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// The in-flight load-queue fetch finished.
    LoadComplete(LoadOutcome),
    /// An on-demand definition fetch finished.
    DefinitionFetched { ns: Namespace, outcome: LoadOutcome },
    /// A waited-for element entered the document.
    ElementAvailable { id: String, element: ElementHandle },
    /// The document is fully parsed.
    DomReady,
    /// A region's content is fully parsed.
    ContentReady(RegionGuid),
    /// An AJAX transaction finished.
    AjaxComplete { call: u64, result: AjaxResult },
    /// A raw host interaction was observed.
    Interaction(RawEvent),
}

/// Success continuation of an [`RegionContext::execute`] call.
pub type AjaxSuccess = Box<dyn FnOnce(&Arc<RegionContext>, AjaxResponse) + Send>;

/// Arguments to a destroy operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyArgs {
    /// Keep the container element in the document (soft destroy).
    pub partial: bool,
}

enum DeferredOp {
    InitRegion(RegionGuid, RegionConfig),
    InitPlugin(String),
}

struct PendingAjax {
    guid: RegionGuid,
    command: String,
    handle: AjaxHandle,
    on_success: Option<AjaxSuccess>,
}

/// Borrowed view of one region, the surface handed to behaviors and
/// embedders that already hold a context.
pub struct RegionHandle<'a> {
    ctx: &'a Arc<RegionContext>,
    guid: &'a RegionGuid,
}

impl<'a> RegionHandle<'a> {
    /// The region's guid.
    pub fn guid(&self) -> &RegionGuid {
        self.guid
    }

    /// The owning context.
    pub fn context(&self) -> &Arc<RegionContext> {
        self.ctx
    }

    /// Subscribe a listener on this region's bus.
    pub fn on(&self, layer: impl Into<String>, listener: RegionListener) {
        if let Some(instance) = self.ctx.instance(self.guid) {
            instance.on(layer, listener);
        }
    }

    /// Fire a layer locally.
    pub fn fire(&self, layer: &str, msg: &mut Message) -> bool {
        match self.ctx.instance(self.guid) {
            Some(instance) => instance.fire(layer, msg),
            None => msg.flagged,
        }
    }

    /// Bubble messages from this region up to the root.
    pub fn bubbling(&self, layer: &str, messages: &[String], msg: &mut Message) -> bool {
        bus::bubbling(self.ctx, self.guid, layer, messages, msg, false)
    }

    /// Broadcast a message down through this region's live descendants.
    pub fn broadcast(&self, layer: &str, message: &str, msg: &mut Message) -> bool {
        bus::broadcast(self.ctx, self.guid, layer, message, msg, false)
    }

    /// Wake a dormant lazy child.
    pub fn wake_child(&self, child: &RegionGuid) -> bool {
        self.ctx.wake_child(self.guid, child)
    }

    /// Execute a server command for this region.
    pub fn execute(
        &self,
        command: &str,
        args: Vec<(String, String)>,
        callback: Option<AjaxSuccess>,
    ) -> Result<AjaxHandle, RegionError> {
        self.ctx.execute(self.guid, command, args, callback)
    }

    /// Destroy this region.
    pub fn destroy(&self, args: DestroyArgs) -> Result<(), RegionError> {
        self.ctx.destroy_region(self.guid, args)
    }
}

/// The per-page region runtime.
pub struct RegionContext {
    config: PageConfig,
    adapters: Adapters,
    registry: DefinitionRegistry,
    plugins: PluginRegistry,
    cache: Mutex<DependencyCache>,
    queue: LoadQueue,
    tree: RwLock<HashMap<RegionGuid, Arc<RegionInstance>>>,
    root: RegionGuid,
    root_ready: RwLock<bool>,
    dom_is_ready: RwLock<bool>,
    waiting: Mutex<Vec<DeferredOp>>,
    domready_deferred: Mutex<Vec<(RegionGuid, RegionConfig)>>,
    dom_waiters: Mutex<HashMap<String, Vec<RegionGuid>>>,
    pending_ajax: Mutex<HashMap<u64, PendingAjax>>,
    next_call: AtomicU64,
    tx: Sender<RuntimeEvent>,
    rx: Receiver<RuntimeEvent>,
    booted: RwLock<bool>,
}

impl RegionContext {
    /// Create a context. Nothing happens until [`RegionContext::boot`].
    pub fn new(config: PageConfig, adapters: Adapters) -> Arc<Self> {
        let (tx, rx) = unbounded();
        let queue_tx = tx.clone();
        let queue = LoadQueue::new(adapters.script.clone(), move |outcome| {
            let _ = queue_tx.send(RuntimeEvent::LoadComplete(outcome));
        });
        let root = config
            .guid
            .clone()
            .unwrap_or_else(|| RegionGuid::from(DEFAULT_ROOT_GUID));
        Arc::new(Self {
            config,
            adapters,
            registry: DefinitionRegistry::new(),
            plugins: PluginRegistry::new(),
            cache: Mutex::new(DependencyCache::new()),
            queue,
            tree: RwLock::new(HashMap::new()),
            root,
            root_ready: RwLock::new(false),
            dom_is_ready: RwLock::new(false),
            waiting: Mutex::new(Vec::new()),
            domready_deferred: Mutex::new(Vec::new()),
            dom_waiters: Mutex::new(HashMap::new()),
            pending_ajax: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(1),
            tx,
            rx,
            booted: RwLock::new(false),
        })
    }

    /// Start the page: subscribe the document-ready signal and initialize
    /// the root region from the page configuration.
    pub fn boot(self: &Arc<Self>) {
        {
            let mut booted = self.booted.write();
            if *booted {
                log::warn!("context already booted");
                return;
            }
            *booted = true;
        }
        let tx = self.tx.clone();
        self.adapters.dom.dom_ready(Completion::new(move |_| {
            let _ = tx.send(RuntimeEvent::DomReady);
        }));

        // the root definition is inline: the generic capability set
        self.set_definition(ROOT_NAMESPACE, Some(DefinitionBody::default()));

        let root_config = RegionConfig {
            ns: Namespace::from(ROOT_NAMESPACE),
            require: self.config.require.clone(),
            dependencies: self.config.dependencies.clone(),
            plugins: self.config.plugins.clone(),
            actions: self.config.actions.clone(),
            wrapper: self.config.wrapper.clone(),
            ondomready: self.config.ondomready,
            ..RegionConfig::default()
        };
        if let Err(err) = self.init_region_now(self.root.clone(), root_config) {
            log::error!("root region init failed: {}", err);
        }
    }

    /// Tear the whole tree down and drop undelivered completions.
    pub fn shutdown(self: &Arc<Self>) {
        log::info!("shutting down region tree");
        let guids: Vec<RegionGuid> = self.tree.read().keys().cloned().collect();
        if self.instance(&self.root).is_some() {
            let _ = self.destroy_region(&self.root.clone(), DestroyArgs::default());
        }
        for guid in guids {
            if self.instance(&guid).is_some() {
                let _ = self.destroy_region(&guid, DestroyArgs::default());
            }
        }
        while self.rx.try_recv().is_ok() {}
    }

    // ---- accessors ----------------------------------------------------

    /// The page configuration.
    pub fn page_config(&self) -> &PageConfig {
        &self.config
    }

    /// The root region's guid.
    pub fn root_guid(&self) -> &RegionGuid {
        &self.root
    }

    /// Whether the root region reached ready.
    pub fn is_root_ready(&self) -> bool {
        *self.root_ready.read()
    }

    /// Look up a live instance.
    pub fn instance(&self, guid: &RegionGuid) -> Option<Arc<RegionInstance>> {
        self.tree.read().get(guid).cloned()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.tree.read().len()
    }

    /// A borrowed handle for the region.
    pub fn handle<'a>(self: &'a Arc<Self>, guid: &'a RegionGuid) -> RegionHandle<'a> {
        RegionHandle { ctx: self, guid }
    }

    /// The serialized load queue.
    pub fn queue(&self) -> &LoadQueue {
        &self.queue
    }

    pub(crate) fn dom(&self) -> &dyn DomAdapter {
        self.adapters.dom.as_ref()
    }

    pub(crate) fn event_sender(&self) -> Sender<RuntimeEvent> {
        self.tx.clone()
    }

    // ---- definitions and plugins --------------------------------------

    /// Register a region definition, constructing every instance that was
    /// waiting for it (last subscribed, first constructed).
    pub fn set_definition(self: &Arc<Self>, ns: impl Into<Namespace>, body: Option<DefinitionBody>) {
        let ns = ns.into();
        for pending in self.registry.set_definition(&ns, body) {
            self.create_instance(pending);
        }
    }

    /// Whether a loader entry exists for the namespace.
    pub fn is_registered(&self, ns: impl Into<Namespace>) -> bool {
        self.registry.is_registered(&ns.into())
    }

    /// Register a plugin definition. First registration of a name wins.
    pub fn set_plugin_definition(&self, name: impl Into<String>, plugin: Plugin) {
        self.plugins.set(name, plugin);
    }

    /// Whether the plugin name is registered.
    pub fn is_plugin(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    /// Install a plugin on the root region, deferred until the root is
    /// ready.
    pub fn init_plugin(self: &Arc<Self>, name: impl Into<String>) -> Result<(), RegionError> {
        let name = name.into();
        if !self.is_root_ready() {
            log::debug!("root not ready, deferring plugin '{}'", name);
            self.waiting.lock().push(DeferredOp::InitPlugin(name));
            return Ok(());
        }
        self.apply_plugin(&self.root.clone(), &name)
    }

    /// Install a plugin on a specific region.
    pub fn init_plugin_on(&self, guid: &RegionGuid, name: &str) -> Result<(), RegionError> {
        self.apply_plugin(guid, name)
    }

    fn apply_plugin(&self, guid: &RegionGuid, name: &str) -> Result<(), RegionError> {
        let Some(instance) = self.instance(guid) else {
            return Err(RegionError::NotFound(guid.clone()));
        };
        let Some(plugin) = self.plugins.get(name) else {
            return Err(RegionError::UnknownPlugin(name.to_string()));
        };
        for (layer, listener) in plugin.actions.iter() {
            instance.on(layer.clone(), listener.clone());
        }
        log::debug!("region '{}': plugin '{}' installed", guid, name);
        Ok(())
    }

    // ---- region lifecycle ---------------------------------------------

    /// Initialize a region. Before the root is ready the call parks in the
    /// waiting list and is drained once the page comes up.
    pub fn init_region(
        self: &Arc<Self>,
        guid: impl Into<RegionGuid>,
        config: RegionConfig,
    ) -> Result<(), RegionError> {
        let guid = guid.into();
        if !self.is_root_ready() && guid != self.root {
            log::debug!("root not ready, deferring init of '{}'", guid);
            self.waiting.lock().push(DeferredOp::InitRegion(guid, config));
            return Ok(());
        }
        self.init_region_now(guid, config)
    }

    fn init_region_now(
        self: &Arc<Self>,
        guid: RegionGuid,
        mut config: RegionConfig,
    ) -> Result<(), RegionError> {
        if config.ondomready && !*self.dom_is_ready.read() {
            config.ondomready = false;
            log::info!("deferring '{}' until the document is parsed", guid);
            self.domready_deferred.lock().push((guid, config));
            return Ok(());
        }
        config.lazyload = false;
        if config.parent.is_none() && guid != self.root {
            config.parent = Some(self.root.clone());
        }
        if config.ns.is_empty() {
            log::warn!("region '{}' has no namespace", guid);
            return Err(RegionError::MissingNamespace(guid));
        }
        if self.tree.read().contains_key(&guid) {
            log::warn!("region '{}' already exists, keeping the live instance", guid);
            return Err(RegionError::DuplicateGuid(guid));
        }

        let ns = config.ns.clone();
        let source = config.region.clone();
        let pending = PendingInstance { guid, config };
        match self.registry.subscribe(&ns, pending, source.as_deref()) {
            SubscribeAction::Notify(list) => {
                for p in list {
                    self.create_instance(p);
                }
            }
            SubscribeAction::Fetch(url) => {
                log::info!("fetching definition '{}' from {}", ns, url);
                let tx = self.tx.clone();
                let fetched_ns = ns.clone();
                self.adapters.script.load(
                    &[url],
                    Completion::new(move |outcome| {
                        let _ = tx.send(RuntimeEvent::DefinitionFetched {
                            ns: fetched_ns,
                            outcome,
                        });
                    }),
                );
            }
            SubscribeAction::Wait => {}
        }
        Ok(())
    }

    fn create_instance(self: &Arc<Self>, pending: PendingInstance) {
        let PendingInstance { guid, mut config } = pending;
        let Some(definition) = self.registry.definition(&config.ns) else {
            log::error!("no definition for '{}' while creating '{}'", config.ns, guid);
            return;
        };
        config.merge_defaults(&definition.defaults);
        if self.tree.read().contains_key(&guid) {
            log::warn!("region '{}' appeared while pending, skipping", guid);
            return;
        }
        log::info!("creating region '{}' ({})", guid, config.ns);
        let instance = RegionInstance::new(guid.clone(), config, definition.behavior.clone());
        self.tree.write().insert(guid.clone(), instance.clone());
        instance
            .behavior()
            .on_init(&RegionHandle { ctx: self, guid: &guid });
        self.load_dependencies(&instance);
    }

    fn load_dependencies(self: &Arc<Self>, instance: &Arc<RegionInstance>) {
        instance.set_state(RegionState::LoadingDeps);
        let config = instance.config();

        let mut combined: Vec<String> = config.require.clone();
        for base in BASE_REQUIRES {
            if !combined.iter().any(|r| r == base) {
                combined.push((*base).to_string());
            }
        }
        let files: Vec<String> = {
            let cache = self.cache.lock();
            config
                .dependencies
                .iter()
                .filter(|dep| !cache.is_cached(dep))
                .map(|dep| dep.fullpath.clone())
                .collect()
        };
        combined.extend(files.iter().cloned());

        log::debug!("region '{}': requesting {:?}", instance.guid(), combined);
        let ctx = Arc::downgrade(self);
        let guid = instance.guid().clone();
        self.queue.enqueue(combined, LoadKind::Script, move || {
            if let Some(ctx) = ctx.upgrade() {
                ctx.cache.lock().cache(&files);
                ctx.deps_ready(&guid);
            }
        });
    }

    fn deps_ready(self: &Arc<Self>, guid: &RegionGuid) {
        let Some(instance) = self.instance(guid) else {
            return; // destroyed while its dependencies loaded
        };
        instance.set_state(RegionState::WaitingDom);
        if *guid == self.root {
            if *self.dom_is_ready.read() {
                self.root_bind();
            }
            return;
        }
        let target = instance
            .config()
            .wrapper
            .clone()
            .unwrap_or_else(|| guid.as_str().to_string());
        self.resolve_target(guid, target);
    }

    fn resolve_target(self: &Arc<Self>, guid: &RegionGuid, target: String) {
        if let Some(el) = self.adapters.dom.query_one(&format!("#{}", target), None) {
            self.element_ready(guid, el);
            return;
        }
        log::debug!("region '{}': waiting for element '{}'", guid, target);
        self.dom_waiters
            .lock()
            .entry(target.clone())
            .or_default()
            .push(guid.clone());
        let tx = self.tx.clone();
        let id = target.clone();
        self.adapters.dom.element_available(
            &target,
            Completion::new(move |element| {
                let _ = tx.send(RuntimeEvent::ElementAvailable { id, element });
            }),
        );
    }

    fn root_bind(self: &Arc<Self>) {
        let root = self.root.clone();
        let Some(instance) = self.instance(&root) else {
            return;
        };
        if instance.state() != RegionState::WaitingDom {
            return;
        }
        match instance.config().wrapper.clone() {
            Some(wrapper) => self.resolve_target(&root, wrapper),
            None => {
                let body = self.adapters.dom.root_element();
                self.element_ready(&root, body);
            }
        }
    }

    fn element_ready(self: &Arc<Self>, guid: &RegionGuid, el: ElementHandle) {
        let Some(instance) = self.instance(guid) else {
            return;
        };
        if instance.state() != RegionState::WaitingDom {
            return; // duplicate availability signal
        }
        // with a wrapper, the container is created inside it; the root
        // binds its wrapper (or the document body) directly
        let container = if instance.config().wrapper.is_some() && *guid != self.root {
            self.adapters.dom.create_container(el, guid.as_str())
        } else {
            el
        };
        instance.bind_container(container);

        if instance.config().ajax {
            log::info!("region '{}': fetching content over ajax", guid);
            let target = guid.clone();
            let result = self.execute_internal(
                guid,
                "render",
                Vec::new(),
                Some(Box::new(move |ctx: &Arc<RegionContext>, response| {
                    if let Some(instance) = ctx.instance(&target) {
                        if let Some(container) = instance.container() {
                            ctx.adapters.dom.set_inner_html(container, &response.body);
                        }
                        ctx.region_ready(&target);
                    }
                })),
            );
            if let Err(err) = result {
                log::warn!("region '{}': content fetch failed to start: {}", guid, err);
            }
        } else {
            self.region_ready(guid);
        }
    }

    fn region_ready(self: &Arc<Self>, guid: &RegionGuid) {
        let Some(instance) = self.instance(guid) else {
            return;
        };
        let Some(container) = instance.container() else {
            log::warn!("region '{}': ready without a container", guid);
            return;
        };
        self.adapters.dom.set_attribute(container, "id", guid.as_str());
        self.adapters.dom.add_class(container, REGION_MARKER_CLASS);

        for (layer, listener) in instance.config().actions.iter() {
            instance.on(layer.clone(), listener.clone());
        }
        for name in instance.config().plugins.clone() {
            if let Err(err) = self.apply_plugin(guid, &name) {
                log::warn!("region '{}': {}", guid, err);
            }
        }
        if let Some(parent) = instance.parent() {
            if let Some(parent_instance) = self.instance(&parent) {
                parent_instance.set_child_live(guid);
            }
        }
        instance.set_state(RegionState::Ready);

        for (child_guid, mut child_config, lazy) in instance.declared_children() {
            if lazy {
                continue;
            }
            child_config.parent = Some(guid.clone());
            child_config.lazyload = false;
            if let Err(err) = self.init_region_now(child_guid, child_config) {
                log::warn!("region '{}': child init failed: {}", guid, err);
            }
        }

        instance
            .behavior()
            .on_ready(&RegionHandle { ctx: self, guid });
        instance.fire("region:ready", &mut Message::empty());

        let tx = self.tx.clone();
        let ready_guid = guid.clone();
        self.adapters.dom.content_ready(
            container,
            Completion::new(move |_| {
                let _ = tx.send(RuntimeEvent::ContentReady(ready_guid));
            }),
        );

        if *guid == self.root {
            *self.root_ready.write() = true;
            log::info!("root region '{}' ready", guid);
            router::wire_root(self);
            self.drain_waiting();
        }
    }

    fn drain_waiting(self: &Arc<Self>) {
        loop {
            let op = self.waiting.lock().pop();
            let Some(op) = op else { break };
            match op {
                DeferredOp::InitRegion(guid, config) => {
                    if let Err(err) = self.init_region_now(guid, config) {
                        log::warn!("deferred region init failed: {}", err);
                    }
                }
                DeferredOp::InitPlugin(name) => {
                    if let Err(err) = self.apply_plugin(&self.root.clone(), &name) {
                        log::warn!("deferred plugin install failed: {}", err);
                    }
                }
            }
        }
    }

    /// Promote a dormant lazy child of `parent` to live, exactly once.
    /// Returns whether a wake actually happened.
    pub fn wake_child(self: &Arc<Self>, parent: &RegionGuid, child: &RegionGuid) -> bool {
        let Some(parent_instance) = self.instance(parent) else {
            return false;
        };
        let Some(mut config) = parent_instance.dormant_child(child) else {
            return false; // unknown, already woken, or never lazy
        };
        parent_instance.mark_child_woken(child);
        config.parent = Some(parent.clone());
        config.lazyload = false;
        log::info!("waking child '{}' of '{}'", child, parent);
        match self.init_region_now(child.clone(), config) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("wake of '{}' failed: {}", child, err);
                false
            }
        }
    }

    /// Destroy a region and its live non-lazy children. `partial` keeps
    /// the container elements in the document.
    pub fn destroy_region(
        self: &Arc<Self>,
        guid: &RegionGuid,
        args: DestroyArgs,
    ) -> Result<(), RegionError> {
        let Some(instance) = self.instance(guid) else {
            return Err(RegionError::NotFound(guid.clone()));
        };
        self.destroy_instance(&instance, args);
        Ok(())
    }

    /// Soft-destroy: tear the region down but keep its DOM.
    pub fn clear_region(self: &Arc<Self>, guid: &RegionGuid) -> Result<(), RegionError> {
        log::info!("clearing region '{}'", guid);
        self.destroy_region(guid, DestroyArgs { partial: true })
    }

    fn destroy_instance(self: &Arc<Self>, instance: &Arc<RegionInstance>, args: DestroyArgs) {
        let guid = instance.guid().clone();
        let mut msg = Message::new(MessageBody::Data(
            serde_json::json!({ "partial": args.partial }),
        ));
        // listeners observe the teardown; they cannot veto it
        instance.fire("region:destroy", &mut msg);
        instance
            .behavior()
            .on_destroy(&RegionHandle { ctx: self, guid: &guid });

        if let Some(container) = instance.container() {
            self.adapters.dom.detach(container);
            if !args.partial {
                self.adapters.dom.remove_element(container);
            }
        }
        for child_guid in instance.live_children() {
            if let Some(child) = self.instance(&child_guid) {
                self.destroy_instance(&child, args);
            }
        }
        self.release_instance(instance);
    }

    /// Remove an instance from the tree, identity-checked: when the tree's
    /// entry for the guid is a different live instance, the removal is a
    /// protected no-op.
    pub fn release_instance(&self, instance: &Arc<RegionInstance>) {
        let guid = instance.guid();
        {
            let mut tree = self.tree.write();
            match tree.get(guid) {
                Some(existing) if Arc::ptr_eq(existing, instance) => {
                    tree.remove(guid);
                }
                _ => {
                    log::warn!("region '{}' is not owned by this tree, skipping removal", guid);
                    return;
                }
            }
        }
        instance.set_state(RegionState::Destroyed);
        log::info!("region '{}' destroyed", guid);
    }

    // ---- messaging ----------------------------------------------------

    /// Fire a layer on an arbitrary instance. `None` for an unknown guid.
    pub fn notify(&self, guid: &RegionGuid, layer: &str, msg: &mut Message) -> Option<bool> {
        self.instance(guid).map(|instance| instance.fire(layer, msg))
    }

    /// Broadcast a message from the root through the whole tree on the
    /// `broadcast` layer.
    pub fn broadcast_all(self: &Arc<Self>, message: &str, msg: &mut Message) -> bool {
        let root = self.root.clone();
        bus::broadcast(self, &root, "broadcast", message, msg, false)
    }

    // ---- ajax ---------------------------------------------------------

    /// Execute a server command for a region.
    ///
    /// GET arguments are the region's `getargs` plus `guid` and `command`;
    /// the body is the region's `postargs` plus `args`. An empty body
    /// issues a GET, anything else a POST. With no callback, success fires
    /// `region:executed` and failure `region:error`; a callback replaces
    /// the success path only. The call bubbles `region:loading` once
    /// issued.
    pub fn execute(
        self: &Arc<Self>,
        guid: &RegionGuid,
        command: &str,
        args: Vec<(String, String)>,
        callback: Option<AjaxSuccess>,
    ) -> Result<AjaxHandle, RegionError> {
        self.execute_internal(guid, command, args, callback)
    }

    fn execute_internal(
        self: &Arc<Self>,
        guid: &RegionGuid,
        command: &str,
        args: Vec<(String, String)>,
        on_success: Option<AjaxSuccess>,
    ) -> Result<AjaxHandle, RegionError> {
        let Some(instance) = self.instance(guid) else {
            return Err(RegionError::NotFound(guid.clone()));
        };
        let config = instance.config();
        let uri = config
            .ws
            .clone()
            .unwrap_or_else(|| format!("/ajax/{}/ws", config.ns));

        let mut query: Vec<(String, String)> = config
            .getargs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.push(("guid".to_string(), guid.as_str().to_string()));
        query.push(("command".to_string(), command.to_string()));

        let mut body: Vec<(String, String)> = config
            .postargs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        body.extend(args);

        let method = if body.is_empty() {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        };

        let call = self.next_call.fetch_add(1, Ordering::Relaxed);
        let tx = self.tx.clone();
        let handle = self.adapters.ajax.request(
            AjaxRequest {
                method,
                uri: uri.clone(),
                query,
                body,
            },
            Completion::new(move |result| {
                let _ = tx.send(RuntimeEvent::AjaxComplete { call, result });
            }),
        );
        log::info!("region '{}': executing '{}' against {}", guid, command, uri);
        self.pending_ajax.lock().insert(
            call,
            PendingAjax {
                guid: guid.clone(),
                command: command.to_string(),
                handle,
                on_success,
            },
        );

        let mut msg = Message::new(MessageBody::Ajax(AjaxEvent {
            command: command.to_string(),
            handle,
            node: instance.container(),
            response: None,
        }));
        bus::bubbling(self, guid, "region", &["loading".to_string()], &mut msg, false);
        Ok(handle)
    }

    fn ajax_complete(self: &Arc<Self>, call: u64, result: AjaxResult) {
        let Some(pending) = self.pending_ajax.lock().remove(&call) else {
            log::warn!("ajax completion for unknown call");
            return;
        };
        let Some(instance) = self.instance(&pending.guid) else {
            return; // destroyed while the call was in flight
        };
        match result {
            Ok(response) => {
                if let Some(on_success) = pending.on_success {
                    on_success(self, response);
                } else {
                    let mut msg = Message::new(MessageBody::Ajax(AjaxEvent {
                        command: pending.command,
                        handle: pending.handle,
                        node: instance.container(),
                        response: Some(response),
                    }));
                    instance.fire("region:executed", &mut msg);
                }
            }
            Err(failure) => {
                log::warn!(
                    "region '{}': '{}' failed: {}",
                    pending.guid,
                    pending.command,
                    failure.reason
                );
                let mut msg = Message::new(MessageBody::Ajax(AjaxEvent {
                    command: pending.command,
                    handle: pending.handle,
                    node: instance.container(),
                    response: None,
                }));
                instance.fire("region:error", &mut msg);
            }
        }
    }

    // ---- event pump ---------------------------------------------------

    /// Drain and process every queued runtime event. Returns the number of
    /// events handled.
    pub fn pump(self: &Arc<Self>) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Pump until no adapter completion remains queued.
    pub fn run_until_idle(self: &Arc<Self>) -> usize {
        let mut total = 0;
        loop {
            let handled = self.pump();
            if handled == 0 {
                break;
            }
            total += handled;
        }
        total
    }

    /// Inject a raw interaction, as a DOM adapter would.
    pub fn dispatch_raw_event(self: &Arc<Self>, raw: RawEvent) {
        let _ = self.tx.send(RuntimeEvent::Interaction(raw));
    }

    fn handle_event(self: &Arc<Self>, event: RuntimeEvent) {
        match event {
            RuntimeEvent::LoadComplete(outcome) => self.queue.complete(outcome),
            RuntimeEvent::DefinitionFetched { ns, outcome } => {
                if outcome != LoadOutcome::Success {
                    log::warn!(
                        "definition fetch for '{}' ended with {:?}; subscribers stay pending",
                        ns,
                        outcome
                    );
                }
            }
            RuntimeEvent::ElementAvailable { id, element } => {
                let waiters = self.dom_waiters.lock().remove(&id).unwrap_or_default();
                for guid in waiters {
                    self.element_ready(&guid, element);
                }
            }
            RuntimeEvent::DomReady => {
                *self.dom_is_ready.write() = true;
                self.root_bind();
                loop {
                    let deferred = self.domready_deferred.lock().pop();
                    let Some((guid, config)) = deferred else { break };
                    if let Err(err) = self.init_region_now(guid, config) {
                        log::warn!("document-ready region init failed: {}", err);
                    }
                }
            }
            RuntimeEvent::ContentReady(guid) => {
                if let Some(instance) = self.instance(&guid) {
                    instance.fire("region:contentready", &mut Message::empty());
                    // external test harnesses synchronize on this
                    instance.fire("test:ready", &mut Message::empty());
                }
            }
            RuntimeEvent::AjaxComplete { call, result } => self.ajax_complete(call, result),
            RuntimeEvent::Interaction(raw) => router::dispatch(self, raw),
        }
    }
}
