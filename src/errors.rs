//! Unified error types for the gear tracker.
//!
//! Every fallible operation in the crate returns [`Result`]. Containment and
//! date problems get their own variants so callers can tell "cycle detected"
//! apart from "target not found" apart from a blank purchase date.

use std::fmt;

use thiserror::Error;

/// Reason a containment change was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentViolation {
    /// The item was assigned to itself
    SelfReference,
    /// The target container does not exist
    ContainerNotFound,
    /// The target exists but is not flagged as a container
    NotAContainer,
    /// The assignment would close a loop in the containment chain
    Cycle,
    /// A container cannot lose its flag while items are still stored in it
    StillHasContents,
}

impl fmt::Display for ContainmentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SelfReference => "an item cannot contain itself",
            Self::ContainerNotFound => "target container not found",
            Self::NotAContainer => "target is not a container",
            Self::Cycle => "cycle detected",
            Self::StillHasContents => "container still has contents",
        };
        f.write_str(text)
    }
}

/// Main error type for all gear tracker operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A containment assignment broke one of the containment invariants
    #[error("Invalid containment for item {item_id} (container {container_id:?}): {violation}")]
    InvalidContainment {
        /// Item whose container was being changed
        item_id: i64,
        /// Proposed container, if any
        container_id: Option<i64>,
        /// What went wrong
        violation: ContainmentViolation,
    },

    /// Purchase date is missing, unparseable or outside the supported range
    #[error("Depreciation not computable: {reason}")]
    InvalidDate {
        /// Human-readable reason
        reason: String,
    },

    /// A numeric field failed validation
    #[error("Invalid value for {field}: {message}")]
    InvalidInput {
        /// Offending field name
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Item lookup by id failed
    #[error("Item not found: {id}")]
    ItemNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// A batch of per-item writes stopped part way; earlier writes stay applied
    #[error("Batch update stopped after {applied} of {planned} changes: {source}")]
    PartialUpdate {
        /// Writes that were committed before the failure
        applied: usize,
        /// Writes the batch intended to make
        planned: usize,
        /// The store error that stopped the batch
        #[source]
        source: sea_orm::DbErr,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// Error raised by the item store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidContainment`].
    #[must_use]
    pub const fn containment(
        item_id: i64,
        container_id: Option<i64>,
        violation: ContainmentViolation,
    ) -> Self {
        Self::InvalidContainment {
            item_id,
            container_id,
            violation,
        }
    }

    /// Returns the containment violation carried by this error, if any.
    #[must_use]
    pub const fn containment_violation(&self) -> Option<ContainmentViolation> {
        match self {
            Self::InvalidContainment { violation, .. } => Some(*violation),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment_messages_are_distinct() {
        let cycle = Error::containment(1, Some(2), ContainmentViolation::Cycle);
        let missing = Error::containment(1, Some(2), ContainmentViolation::ContainerNotFound);

        assert!(cycle.to_string().contains("cycle detected"));
        assert!(missing.to_string().contains("target container not found"));
        assert_ne!(cycle.to_string(), missing.to_string());
    }

    #[test]
    fn test_containment_violation_accessor() {
        let err = Error::containment(3, None, ContainmentViolation::SelfReference);
        assert_eq!(
            err.containment_violation(),
            Some(ContainmentViolation::SelfReference)
        );

        let err = Error::ItemNotFound { id: 3 };
        assert_eq!(err.containment_violation(), None);
    }
}
