//! Error taxonomy for region operations
//!
//! Failures inside propagation (a defective listener, a missing child) are
//! absorbed and logged; the errors here surface only at the public API
//! boundary, where the caller can decide to retry or alert.

use crate::{Namespace, RegionGuid};
use thiserror::Error;

/// Errors from region tree operations.
#[derive(Debug, Clone, Error)]
pub enum RegionError {
    /// A live instance with this guid already exists; the first instance
    /// is left untouched.
    #[error("region '{0}' already exists")]
    DuplicateGuid(RegionGuid),

    /// No live instance with this guid.
    #[error("region '{0}' not found")]
    NotFound(RegionGuid),

    /// The instance asking for removal is not the one the tree owns under
    /// that guid.
    #[error("region '{0}' is not owned by this tree")]
    NotOwned(RegionGuid),

    /// The region was configured without a namespace.
    #[error("region '{0}' has no namespace")]
    MissingNamespace(RegionGuid),

    /// No definition registered (or fetchable) for the namespace.
    #[error("namespace '{0}' is not registered")]
    UnknownNamespace(Namespace),

    /// The named plugin was never registered.
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// The operation needs a DOM target that does not exist.
    #[error("no DOM target '{0}'")]
    MissingTarget(String),

    /// The region is not in a state that allows this operation.
    #[error("region '{0}' is not in a valid state for this operation")]
    InvalidState(RegionGuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegionError::DuplicateGuid(RegionGuid::from("panelA"));
        assert_eq!(err.to_string(), "region 'panelA' already exists");
        let err = RegionError::UnknownPlugin("shortcuts".to_string());
        assert_eq!(err.to_string(), "unknown plugin 'shortcuts'");
    }
}
