//! In-memory stub adapters
//!
//! Minimal collaborator implementations backed by plain data structures.
//! The test suites run entire page lifecycles against them, and headless
//! embeddings can use them as placeholders where no real host exists.

use mosaic_core::{
    AjaxAdapter, AjaxHandle, AjaxRequest, AjaxResponse, AjaxResult, Completion, DomAdapter,
    ElementHandle, EventKind, InteractionRoute, LoadOutcome, RawEvent, ScriptLoader,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

// ---- DOM ---------------------------------------------------------------

struct StubElement {
    id: Option<String>,
    tag: String,
    classes: String,
    value: Option<String>,
    selected: Option<String>,
    parent: Option<ElementHandle>,
    html: String,
}

#[derive(Default)]
struct DomInner {
    elements: HashMap<u64, StubElement>,
    by_id: HashMap<String, ElementHandle>,
    next: u64,
    root: Option<ElementHandle>,
    ready: bool,
    pending_ready: Vec<Completion<()>>,
    pending_available: HashMap<String, Vec<Completion<ElementHandle>>>,
    route: Option<InteractionRoute>,
    observed: Vec<(ElementHandle, EventKind)>,
    detached: Vec<ElementHandle>,
    removed: Vec<ElementHandle>,
    rich_buttons: HashMap<u64, ElementHandle>,
    halted: usize,
}

/// An in-memory document: a handle arena with parent links, ids, classes
/// and values. Elements inserted after boot trigger pending availability
/// waits, mirroring markup that streams in late.
pub struct StubDom {
    inner: Mutex<DomInner>,
}

impl StubDom {
    /// Create a document holding only its body element.
    pub fn new() -> Arc<Self> {
        let dom = Self {
            inner: Mutex::new(DomInner::default()),
        };
        {
            let mut inner = dom.inner.lock();
            let body = Self::alloc(&mut inner, None, "BODY", None);
            inner.root = Some(body);
        }
        Arc::new(dom)
    }

    fn alloc(
        inner: &mut DomInner,
        id: Option<&str>,
        tag: &str,
        parent: Option<ElementHandle>,
    ) -> ElementHandle {
        inner.next += 1;
        let handle = ElementHandle::new(inner.next);
        inner.elements.insert(
            handle.raw(),
            StubElement {
                id: id.map(str::to_string),
                tag: tag.to_ascii_uppercase(),
                classes: String::new(),
                value: None,
                selected: None,
                parent,
                html: String::new(),
            },
        );
        if let Some(id) = id {
            inner.by_id.insert(id.to_string(), handle);
        }
        handle
    }

    /// Insert an element with an id, firing any pending availability wait.
    pub fn insert(&self, id: &str, tag: &str, parent: Option<ElementHandle>) -> ElementHandle {
        let (handle, waiters) = {
            let mut inner = self.inner.lock();
            let parent = parent.or(inner.root);
            let handle = Self::alloc(&mut inner, Some(id), tag, parent);
            let waiters = inner.pending_available.remove(id).unwrap_or_default();
            (handle, waiters)
        };
        for done in waiters {
            done.complete(handle);
        }
        handle
    }

    /// Insert an element without an id.
    pub fn insert_anonymous(&self, tag: &str, parent: Option<ElementHandle>) -> ElementHandle {
        let mut inner = self.inner.lock();
        let parent = parent.or(inner.root);
        Self::alloc(&mut inner, None, tag, parent)
    }

    /// Set the element's class string.
    pub fn set_classes(&self, el: ElementHandle, classes: &str) {
        if let Some(element) = self.inner.lock().elements.get_mut(&el.raw()) {
            element.classes = classes.to_string();
        }
    }

    /// Set the element's form value.
    pub fn set_value(&self, el: ElementHandle, value: &str) {
        if let Some(element) = self.inner.lock().elements.get_mut(&el.raw()) {
            element.value = Some(value.to_string());
        }
    }

    /// Set the selected option value of a select element.
    pub fn set_selected(&self, el: ElementHandle, value: &str) {
        if let Some(element) = self.inner.lock().elements.get_mut(&el.raw()) {
            element.selected = Some(value.to_string());
        }
    }

    /// Declare that `target` belongs to a rich-button component.
    pub fn link_rich_button(&self, target: ElementHandle, button: ElementHandle) {
        self.inner.lock().rich_buttons.insert(target.raw(), button);
    }

    /// Mark the document as fully parsed, releasing pending waits.
    pub fn set_ready(&self) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.ready = true;
            std::mem::take(&mut inner.pending_ready)
        };
        for done in waiters {
            done.complete(());
        }
    }

    /// Deliver a raw event through the wired interaction route, as a real
    /// host would after `observe`.
    pub fn emit(&self, raw: RawEvent) {
        let route = self.inner.lock().route.clone();
        match route {
            Some(route) => route.deliver(raw),
            None => log::warn!("stub dom: no interaction route wired"),
        }
    }

    // ---- test introspection -------------------------------------------

    /// Whether the element is still in the document.
    pub fn exists(&self, el: ElementHandle) -> bool {
        self.inner.lock().elements.contains_key(&el.raw())
    }

    /// The element's current content.
    pub fn html_of(&self, el: ElementHandle) -> String {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .map(|element| element.html.clone())
            .unwrap_or_default()
    }

    /// The element's current class string.
    pub fn classes_of(&self, el: ElementHandle) -> String {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .map(|element| element.classes.clone())
            .unwrap_or_default()
    }

    /// The element's current id.
    pub fn id_of(&self, el: ElementHandle) -> Option<String> {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .and_then(|element| element.id.clone())
    }

    /// Whether listeners were dropped from the element.
    pub fn is_detached(&self, el: ElementHandle) -> bool {
        self.inner.lock().detached.contains(&el)
    }

    /// Event kinds observed per element.
    pub fn observed(&self) -> Vec<(ElementHandle, EventKind)> {
        self.inner.lock().observed.clone()
    }

    /// How many raw events were halted.
    pub fn halted_count(&self) -> usize {
        self.inner.lock().halted
    }
}

impl DomAdapter for StubDom {
    fn root_element(&self) -> ElementHandle {
        self.inner
            .lock()
            .root
            .unwrap_or_else(|| ElementHandle::new(0))
    }

    fn query_one(&self, selector: &str, root: Option<ElementHandle>) -> Option<ElementHandle> {
        let Some(id) = selector.strip_prefix('#') else {
            log::warn!("stub dom: unsupported selector '{}'", selector);
            return None;
        };
        let inner = self.inner.lock();
        let el = inner.by_id.get(id).copied()?;
        if let Some(root) = root {
            if el != root && !contained(&inner, root, el) {
                return None;
            }
        }
        Some(el)
    }

    fn element_available(&self, id: &str, done: Completion<ElementHandle>) {
        let found = {
            let mut inner = self.inner.lock();
            match inner.by_id.get(id).copied() {
                Some(el) => Some(el),
                None => {
                    inner
                        .pending_available
                        .entry(id.to_string())
                        .or_default()
                        .push(done);
                    return;
                }
            }
        };
        if let Some(el) = found {
            done.complete(el);
        }
    }

    fn dom_ready(&self, done: Completion<()>) {
        {
            let mut inner = self.inner.lock();
            if !inner.ready {
                inner.pending_ready.push(done);
                return;
            }
        }
        done.complete(());
    }

    fn content_ready(&self, _el: ElementHandle, done: Completion<()>) {
        // stub documents parse instantly
        done.complete(());
    }

    fn create_container(&self, wrapper: ElementHandle, id: &str) -> ElementHandle {
        self.insert(id, "DIV", Some(wrapper))
    }

    fn set_inner_html(&self, el: ElementHandle, html: &str) {
        if let Some(element) = self.inner.lock().elements.get_mut(&el.raw()) {
            element.html = html.to_string();
        }
    }

    fn set_attribute(&self, el: ElementHandle, name: &str, value: &str) {
        let mut inner = self.inner.lock();
        if name == "id" {
            if let Some(element) = inner.elements.get_mut(&el.raw()) {
                if let Some(old) = element.id.take() {
                    inner.by_id.remove(&old);
                }
            }
            if let Some(element) = inner.elements.get_mut(&el.raw()) {
                element.id = Some(value.to_string());
            }
            inner.by_id.insert(value.to_string(), el);
        }
    }

    fn add_class(&self, el: ElementHandle, class: &str) {
        if let Some(element) = self.inner.lock().elements.get_mut(&el.raw()) {
            if !element.classes.split_whitespace().any(|c| c == class) {
                if !element.classes.is_empty() {
                    element.classes.push(' ');
                }
                element.classes.push_str(class);
            }
        }
    }

    fn tag_name(&self, el: ElementHandle) -> String {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .map(|element| element.tag.clone())
            .unwrap_or_default()
    }

    fn classes(&self, el: ElementHandle) -> String {
        self.classes_of(el)
    }

    fn value(&self, el: ElementHandle) -> Option<String> {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .and_then(|element| element.value.clone())
    }

    fn selected_value(&self, el: ElementHandle) -> Option<String> {
        self.inner
            .lock()
            .elements
            .get(&el.raw())
            .and_then(|element| element.selected.clone())
    }

    fn ancestor_by_tag(
        &self,
        el: ElementHandle,
        tag: &str,
        max_depth: usize,
    ) -> Option<ElementHandle> {
        let tag = tag.to_ascii_uppercase();
        let inner = self.inner.lock();
        let mut current = Some(el);
        for _ in 0..=max_depth {
            let handle = current?;
            let element = inner.elements.get(&handle.raw())?;
            if element.tag == tag {
                return Some(handle);
            }
            current = element.parent;
        }
        None
    }

    fn contains(&self, ancestor: ElementHandle, el: ElementHandle) -> bool {
        contained(&self.inner.lock(), ancestor, el)
    }

    fn rich_button(&self, el: ElementHandle) -> Option<ElementHandle> {
        self.inner.lock().rich_buttons.get(&el.raw()).copied()
    }

    fn observe(&self, el: ElementHandle, kinds: &[EventKind], route: InteractionRoute) {
        let mut inner = self.inner.lock();
        for kind in kinds {
            inner.observed.push((el, *kind));
        }
        inner.route = Some(route);
    }

    fn observe_document_keys(&self, route: InteractionRoute) {
        self.inner.lock().route = Some(route);
    }

    fn observe_window_resize(&self, route: InteractionRoute) {
        self.inner.lock().route = Some(route);
    }

    fn detach(&self, el: ElementHandle) {
        self.inner.lock().detached.push(el);
    }

    fn remove_element(&self, el: ElementHandle) {
        let mut inner = self.inner.lock();
        if let Some(element) = inner.elements.remove(&el.raw()) {
            if let Some(id) = element.id {
                inner.by_id.remove(&id);
            }
        }
        inner.removed.push(el);
    }

    fn halt(&self, _event: &RawEvent) {
        self.inner.lock().halted += 1;
    }
}

fn contained(inner: &DomInner, ancestor: ElementHandle, el: ElementHandle) -> bool {
    let mut current = inner.elements.get(&el.raw()).and_then(|e| e.parent);
    while let Some(handle) = current {
        if handle == ancestor {
            return true;
        }
        current = inner.elements.get(&handle.raw()).and_then(|e| e.parent);
    }
    false
}

// ---- script loader -----------------------------------------------------

enum LoaderMode {
    Auto(LoadOutcome),
    Manual,
}

struct LoaderInner {
    mode: LoaderMode,
    requests: Vec<Vec<String>>,
    parked: VecDeque<(Vec<String>, Completion<LoadOutcome>)>,
}

/// Script loader with scripted outcomes. `auto_success` completes every
/// fetch inline; `manual` parks fetches until the test releases them.
pub struct StubScriptLoader {
    inner: Mutex<LoaderInner>,
}

impl StubScriptLoader {
    pub fn auto_success() -> Arc<Self> {
        Self::auto(LoadOutcome::Success)
    }

    pub fn auto(outcome: LoadOutcome) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(LoaderInner {
                mode: LoaderMode::Auto(outcome),
                requests: Vec::new(),
                parked: VecDeque::new(),
            }),
        })
    }

    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(LoaderInner {
                mode: LoaderMode::Manual,
                requests: Vec::new(),
                parked: VecDeque::new(),
            }),
        })
    }

    /// Every path set requested so far.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.inner.lock().requests.clone()
    }

    /// Number of parked fetches.
    pub fn pending(&self) -> usize {
        self.inner.lock().parked.len()
    }

    /// Complete the oldest parked fetch.
    pub fn resolve_next(&self, outcome: LoadOutcome) -> bool {
        let parked = self.inner.lock().parked.pop_front();
        match parked {
            Some((_, done)) => {
                done.complete(outcome);
                true
            }
            None => false,
        }
    }
}

impl ScriptLoader for StubScriptLoader {
    fn load(&self, paths: &[String], done: Completion<LoadOutcome>) {
        let outcome = {
            let mut inner = self.inner.lock();
            inner.requests.push(paths.to_vec());
            match inner.mode {
                LoaderMode::Auto(outcome) => Some(outcome),
                LoaderMode::Manual => {
                    inner.parked.push_back((paths.to_vec(), done));
                    return;
                }
            }
        };
        if let Some(outcome) = outcome {
            done.complete(outcome);
        }
    }
}

// ---- ajax --------------------------------------------------------------

enum AjaxMode {
    Auto,
    Manual,
}

struct AjaxInner {
    mode: AjaxMode,
    requests: Vec<AjaxRequest>,
    parked: VecDeque<(AjaxRequest, Completion<AjaxResult>)>,
    canned: VecDeque<AjaxResult>,
}

/// AJAX transport answering from a canned response queue (`auto`) or on
/// explicit release (`manual`).
pub struct StubAjax {
    inner: Mutex<AjaxInner>,
}

impl StubAjax {
    pub fn auto() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(AjaxInner {
                mode: AjaxMode::Auto,
                requests: Vec::new(),
                parked: VecDeque::new(),
                canned: VecDeque::new(),
            }),
        })
    }

    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(AjaxInner {
                mode: AjaxMode::Manual,
                requests: Vec::new(),
                parked: VecDeque::new(),
                canned: VecDeque::new(),
            }),
        })
    }

    /// Queue a canned result for the next auto-answered request.
    pub fn enqueue_response(&self, result: AjaxResult) {
        self.inner.lock().canned.push_back(result);
    }

    /// Complete the oldest parked request.
    pub fn respond_next(&self, result: AjaxResult) -> bool {
        let parked = self.inner.lock().parked.pop_front();
        match parked {
            Some((_, done)) => {
                done.complete(result);
                true
            }
            None => false,
        }
    }

    /// Every request issued so far.
    pub fn requests(&self) -> Vec<AjaxRequest> {
        self.inner.lock().requests.clone()
    }
}

impl AjaxAdapter for StubAjax {
    fn request(&self, req: AjaxRequest, done: Completion<AjaxResult>) -> AjaxHandle {
        let handle = AjaxHandle::next();
        let result = {
            let mut inner = self.inner.lock();
            inner.requests.push(req.clone());
            match inner.mode {
                AjaxMode::Auto => Some(inner.canned.pop_front().unwrap_or(Ok(AjaxResponse {
                    status: 200,
                    body: String::new(),
                }))),
                AjaxMode::Manual => {
                    inner.parked.push_back((req, done));
                    return handle;
                }
            }
        };
        if let Some(result) = result {
            done.complete(result);
        }
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_waits_resolve_on_insert() {
        let dom = StubDom::new();
        let seen: Arc<Mutex<Option<ElementHandle>>> = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        dom.element_available(
            "late",
            Completion::new(move |el| {
                *sink.lock() = Some(el);
            }),
        );
        assert!(seen.lock().is_none());

        let el = dom.insert("late", "DIV", None);
        assert_eq!(*seen.lock(), Some(el));
    }

    #[test]
    fn test_ancestor_search_depth_bounded() {
        let dom = StubDom::new();
        let anchor = dom.insert_anonymous("A", None);
        let mut parent = anchor;
        for _ in 0..3 {
            parent = {
                let child = dom.insert_anonymous("SPAN", Some(parent));
                child
            };
        }
        // three levels up is within a depth-5 search, not a depth-2 one
        assert_eq!(dom.ancestor_by_tag(parent, "a", 5), Some(anchor));
        assert_eq!(dom.ancestor_by_tag(parent, "a", 2), None);
    }

    #[test]
    fn test_query_one_scoped_to_root() {
        let dom = StubDom::new();
        let outside = dom.insert("outside", "DIV", None);
        let wrapper = dom.insert("wrapper", "DIV", None);
        let inside = dom.insert("inside", "DIV", Some(wrapper));

        assert_eq!(dom.query_one("#inside", Some(wrapper)), Some(inside));
        assert_eq!(dom.query_one("#outside", Some(wrapper)), None);
        assert_eq!(dom.query_one("#outside", None), Some(outside));
        assert_eq!(dom.query_one("div.inside", None), None);
    }

    #[test]
    fn test_remove_unregisters_id() {
        let dom = StubDom::new();
        let el = dom.insert("gone", "DIV", None);
        dom.remove_element(el);
        assert!(!dom.exists(el));
        assert_eq!(dom.query_one("#gone", None), None);
    }
}
