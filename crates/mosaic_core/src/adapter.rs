//! Collaborator contracts
//!
//! The composition core drives three external collaborators: a script/style
//! loader, a DOM query adapter and an AJAX transport. Each is a trait object
//! implemented by the embedding host (a real browser bridge, or the in-memory
//! stubs used by the test suites).
//!
//! Asynchronous answers travel through one-shot [`Completion`] tokens. A
//! completion consumes itself when fired, so an adapter structurally cannot
//! deliver more than one outcome per call.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque handle to a host DOM element, allocated by the DOM adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    /// Create a handle from a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to an in-flight AJAX transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AjaxHandle(u64);

impl AjaxHandle {
    /// Allocate a new unique handle.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One-shot completion token.
///
/// Firing the token consumes it; an adapter holding a `Completion` can
/// deliver exactly one value, matching the at-most-one-callback contract
/// of the loader interface.
pub struct Completion<T>(Box<dyn FnOnce(T) + Send>);

impl<T> Completion<T> {
    /// Wrap a callback into a completion token.
    pub fn new(f: impl FnOnce(T) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Deliver the value and consume the token.
    pub fn complete(self, value: T) {
        (self.0)(value)
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

/// Terminal outcome of a script/style fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// All requested paths loaded.
    Success,
    /// At least one path failed to load.
    Failure,
    /// The fetch timed out.
    TimedOut,
}

/// Loads script and style resources on demand.
pub trait ScriptLoader: Send + Sync {
    /// Fetch the given paths. Exactly one [`LoadOutcome`] must be delivered
    /// through `done`, whether the fetch succeeds, fails or times out.
    fn load(&self, paths: &[String], done: Completion<LoadOutcome>);
}

/// Kind of a raw host interaction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Focus,
    Blur,
    MouseOver,
    MouseOut,
    KeyDown,
    KeyUp,
    KeyPress,
    Resize,
}

impl EventKind {
    /// Lowercase event name, as used in message layers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::MouseOver => "mouseover",
            Self::MouseOut => "mouseout",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::KeyPress => "keypress",
            Self::Resize => "resize",
        }
    }
}

/// A raw interaction event as delivered by the DOM adapter.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// What happened.
    pub kind: EventKind,
    /// The element the event originated on, when there is one.
    pub target: Option<ElementHandle>,
    /// For pointer crossings, the element the pointer came from or went to.
    pub related_target: Option<ElementHandle>,
}

impl RawEvent {
    /// Event with a target and no related element.
    pub fn on(kind: EventKind, target: ElementHandle) -> Self {
        Self {
            kind,
            target: Some(target),
            related_target: None,
        }
    }

    /// Targetless event (keyboard, window resize).
    pub fn ambient(kind: EventKind) -> Self {
        Self {
            kind,
            target: None,
            related_target: None,
        }
    }
}

/// Multi-shot delivery route for raw interaction events.
///
/// Handed to the DOM adapter when the page-level listeners are wired; the
/// adapter calls [`InteractionRoute::deliver`] for every observed event.
#[derive(Clone)]
pub struct InteractionRoute(Arc<dyn Fn(RawEvent) + Send + Sync>);

impl InteractionRoute {
    /// Wrap a delivery function.
    pub fn new(f: impl Fn(RawEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Deliver one event.
    pub fn deliver(&self, event: RawEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for InteractionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InteractionRoute")
    }
}

/// Queries and mutates the host document.
///
/// Selectors passed to [`DomAdapter::query_one`] use CSS syntax; the waits
/// (`element_available`, `dom_ready`, `content_ready`) are one-shot.
pub trait DomAdapter: Send + Sync {
    /// The document's root content element (the page body).
    fn root_element(&self) -> ElementHandle;

    /// Resolve a selector to at most one element, searched under `root`
    /// when given, otherwise the whole document.
    fn query_one(&self, selector: &str, root: Option<ElementHandle>) -> Option<ElementHandle>;

    /// One-shot wait for the element with the given id to enter the live
    /// document. Fires immediately if it is already present.
    fn element_available(&self, id: &str, done: Completion<ElementHandle>);

    /// One-shot wait for the document to be fully parsed.
    fn dom_ready(&self, done: Completion<()>);

    /// One-shot wait for the element's own content to be fully parsed.
    fn content_ready(&self, el: ElementHandle, done: Completion<()>);

    /// Create a container element with the given id inside `wrapper`.
    fn create_container(&self, wrapper: ElementHandle, id: &str) -> ElementHandle;

    /// Replace the element's content.
    fn set_inner_html(&self, el: ElementHandle, html: &str);

    /// Set an attribute on the element.
    fn set_attribute(&self, el: ElementHandle, name: &str, value: &str);

    /// Append a class to the element's class list.
    fn add_class(&self, el: ElementHandle, class: &str);

    /// The element's tag name.
    fn tag_name(&self, el: ElementHandle) -> String;

    /// The element's raw class string.
    fn classes(&self, el: ElementHandle) -> String;

    /// The element's value, for form elements that carry one.
    fn value(&self, el: ElementHandle) -> Option<String>;

    /// The value of the selected option, for select elements.
    fn selected_value(&self, el: ElementHandle) -> Option<String>;

    /// Nearest self-or-ancestor element with the given tag, searching at
    /// most `max_depth` levels up.
    fn ancestor_by_tag(&self, el: ElementHandle, tag: &str, max_depth: usize)
        -> Option<ElementHandle>;

    /// Whether `ancestor` contains `el` (strictly; an element does not
    /// contain itself).
    fn contains(&self, ancestor: ElementHandle, el: ElementHandle) -> bool;

    /// Resolve the rich-button component owning the element, when the host
    /// toolkit has one. Hosts without rich buttons return `None`.
    fn rich_button(&self, _el: ElementHandle) -> Option<ElementHandle> {
        None
    }

    /// Observe interaction events of the given kinds on the element,
    /// delivering them through `route` until the element is detached.
    fn observe(&self, el: ElementHandle, kinds: &[EventKind], route: InteractionRoute);

    /// Observe keyboard events at the document level.
    fn observe_document_keys(&self, route: InteractionRoute);

    /// Observe window resize events.
    fn observe_window_resize(&self, route: InteractionRoute);

    /// Drop every listener bound to the element.
    fn detach(&self, el: ElementHandle);

    /// Remove the element from the document.
    fn remove_element(&self, el: ElementHandle);

    /// Stop propagation and default handling of the raw event in the host.
    fn halt(&self, event: &RawEvent);
}

/// HTTP method of an AJAX call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An AJAX request, fully assembled by the core.
///
/// The adapter owns URL encoding; the core only supplies the pieces.
#[derive(Debug, Clone)]
pub struct AjaxRequest {
    pub method: HttpMethod,
    pub uri: String,
    /// Query-string parameters, in order.
    pub query: Vec<(String, String)>,
    /// Form body parameters; empty for GET.
    pub body: Vec<(String, String)>,
}

/// A successful AJAX response. The body is opaque to the core.
#[derive(Debug, Clone)]
pub struct AjaxResponse {
    pub status: u16,
    pub body: String,
}

/// A failed AJAX call.
#[derive(Debug, Clone)]
pub struct AjaxFailure {
    pub status: u16,
    pub reason: String,
}

/// Terminal result of an AJAX call.
pub type AjaxResult = Result<AjaxResponse, AjaxFailure>;

/// Issues request/response calls against the embedding server.
pub trait AjaxAdapter: Send + Sync {
    /// Issue the request, delivering exactly one result through `done`.
    /// Returns a handle identifying the in-flight transaction.
    fn request(&self, req: AjaxRequest, done: Completion<AjaxResult>) -> AjaxHandle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_completion_fires_once() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let done = Completion::new(move |v: u32| {
            c.fetch_add(v, Ordering::SeqCst);
        });
        done.complete(7);
        assert_eq!(count.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::Click.name(), "click");
        assert_eq!(EventKind::MouseOut.name(), "mouseout");
        assert_eq!(EventKind::Resize.name(), "resize");
    }

    #[test]
    fn test_ajax_handles_unique() {
        assert_ne!(AjaxHandle::next(), AjaxHandle::next());
    }
}
