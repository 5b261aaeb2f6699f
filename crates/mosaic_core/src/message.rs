//! The message model
//!
//! Every bus operation moves a [`Message`]: a mutable envelope shared by all
//! listeners along a propagation path. A listener that flags the message
//! stops upward propagation; broadcasts force-clear the flag and cannot be
//! stopped.

use crate::adapter::{AjaxHandle, AjaxResponse, ElementHandle, RawEvent};
use std::fmt;
use std::sync::Arc;

/// A bus subscriber. Listeners receive the live message and may mutate it.
pub type RegionListener = Arc<dyn Fn(&mut Message) + Send + Sync>;

/// A message travelling across the region tree.
#[derive(Debug, Clone)]
pub struct Message {
    /// Layer the message currently travels on; set by bubbling/broadcast.
    pub layer: String,
    /// Consumption flag. A flagged message stops bubbling upward.
    pub flagged: bool,
    /// Structured payload.
    pub body: MessageBody,
    halted: bool,
}

impl Message {
    /// Message with the given payload.
    pub fn new(body: MessageBody) -> Self {
        Self {
            layer: String::new(),
            flagged: false,
            body,
            halted: false,
        }
    }

    /// Message with no payload.
    pub fn empty() -> Self {
        Self::new(MessageBody::Empty)
    }

    /// Message carrying a classified interaction.
    pub fn interaction(event: SemanticEvent) -> Self {
        Self::new(MessageBody::Interaction(event))
    }

    /// Mark the message as consumed.
    pub fn flag(&mut self) {
        self.flagged = true;
    }

    /// Mark the message as consumed and request that the originating host
    /// event be halted once the synchronous propagation completes.
    pub fn stop(&mut self) {
        self.flagged = true;
        self.halted = true;
    }

    /// Whether a listener asked for the host event to be halted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Reconstruct the listener-facing signature of the message.
    ///
    /// Returns `None` once the message is flagged, so chained handlers on
    /// the same layer short-circuit without re-checking the flag.
    pub fn signature(&self) -> Option<Signature<'_>> {
        if self.flagged {
            return None;
        }
        Some(Signature {
            layer: &self.layer,
            body: &self.body,
        })
    }
}

/// The structured view handed back by [`Message::signature`].
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a> {
    pub layer: &'a str,
    pub body: &'a MessageBody,
}

/// Payload variants carried by a [`Message`].
#[derive(Debug, Clone)]
pub enum MessageBody {
    /// No payload.
    Empty,
    /// A classified host interaction.
    Interaction(SemanticEvent),
    /// An AJAX transaction notification (loading, executed, error).
    Ajax(AjaxEvent),
    /// Free-form data supplied by the caller.
    Data(serde_json::Value),
}

/// Payload of the `region:loading` / `region:executed` / `region:error`
/// messages around an AJAX transaction.
#[derive(Debug, Clone)]
pub struct AjaxEvent {
    /// Command the region executed.
    pub command: String,
    /// Transaction handle from the AJAX adapter.
    pub handle: AjaxHandle,
    /// The region's container, when already bound.
    pub node: Option<ElementHandle>,
    /// The response; `None` while the transaction is in flight, and for
    /// failures without a response body.
    pub response: Option<AjaxResponse>,
}

/// A raw interaction resolved into its semantic parts.
///
/// The classifier fills whichever roles apply; `trigger` is the highest
/// priority element found and the source of `value`/`classes` when they
/// were not resolved earlier.
#[derive(Clone)]
pub struct SemanticEvent {
    pub event: RawEvent,
    pub target: ElementHandle,
    pub trigger: Option<ElementHandle>,
    pub anchor: Option<ElementHandle>,
    pub button: Option<ElementHandle>,
    pub input: Option<ElementHandle>,
    pub select: Option<ElementHandle>,
    pub rich_button: Option<ElementHandle>,
    pub value: Option<String>,
    pub classes: String,
}

impl SemanticEvent {
    /// An unclassified event: just a raw event and its resolved target.
    pub fn from_target(event: RawEvent, target: ElementHandle) -> Self {
        Self {
            event,
            target,
            trigger: None,
            anchor: None,
            button: None,
            input: None,
            select: None,
            rich_button: None,
            value: None,
            classes: String::new(),
        }
    }
}

impl fmt::Debug for SemanticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticEvent")
            .field("kind", &self.event.kind)
            .field("target", &self.target)
            .field("trigger", &self.trigger)
            .field("value", &self.value)
            .field("classes", &self.classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_short_circuits_on_flag() {
        let mut msg = Message::empty();
        msg.layer = "click:click".to_string();
        assert!(msg.signature().is_some());
        msg.flag();
        assert!(msg.signature().is_none());
    }

    #[test]
    fn test_stop_requests_halt() {
        let mut msg = Message::empty();
        assert!(!msg.is_halted());
        msg.stop();
        assert!(msg.flagged);
        assert!(msg.is_halted());
    }
}
