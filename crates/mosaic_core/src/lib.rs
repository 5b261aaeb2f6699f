//! # Mosaic Core
//!
//! Shared vocabulary for the Mosaic composition layer:
//! - Region and namespace identifiers
//! - The message model carried by the per-region bus
//! - Collaborator contracts (script loader, DOM adapter, AJAX adapter)
//! - The error taxonomy
//!
//! The crates above this one never talk to a browser directly. Everything
//! that touches the page goes through the narrow adapter traits defined in
//! [`adapter`], so the composition core stays testable and host-agnostic.

pub mod adapter;
pub mod error;
pub mod message;

pub use adapter::{
    AjaxAdapter, AjaxFailure, AjaxHandle, AjaxRequest, AjaxResponse, AjaxResult, Completion,
    DomAdapter, ElementHandle, EventKind, HttpMethod, InteractionRoute, LoadOutcome, RawEvent,
    ScriptLoader,
};
pub use error::RegionError;
pub use message::{AjaxEvent, Message, MessageBody, RegionListener, SemanticEvent, Signature};

use std::fmt;

/// Default identifier for the page-root region when none is configured.
pub const DEFAULT_ROOT_GUID: &str = "page";

/// Namespace reserved for the page-root region.
pub const ROOT_NAMESPACE: &str = "page";

/// CSS class stamped on every bound region container.
pub const REGION_MARKER_CLASS: &str = "region";

/// Framework modules every region loads regardless of its namespace.
pub const BASE_REQUIRES: &[&str] = &["event", "node"];

/// Unique identifier for a region instance.
///
/// Caller-supplied; doubles as the id of the region's container element,
/// which is why this is a string rather than a numeric handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionGuid(String);

impl RegionGuid {
    /// Create a guid from any string-like value.
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    /// Get the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionGuid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RegionGuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Namespace of a region definition.
///
/// Many instances may share one namespace; the namespace keys the
/// definition registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace from any string-like value.
    pub fn new(ns: impl Into<String>) -> Self {
        Self(ns.into())
    }

    /// Get the raw namespace.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the namespace is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_roundtrip() {
        let guid = RegionGuid::from("panelA");
        assert_eq!(guid.as_str(), "panelA");
        assert_eq!(guid.to_string(), "panelA");
    }

    #[test]
    fn test_namespace_empty() {
        assert!(Namespace::default().is_empty());
        assert!(!Namespace::from("news").is_empty());
    }
}
