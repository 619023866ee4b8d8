//! Error types for link extraction and caching.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use crate::models::DocumentId;
use std::fmt::Display;
use thiserror::Error;

/// Errors surfaced by the link extractor and the link cache.
///
/// Values are `Clone` so a single in-flight extraction can hand the same
/// failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkHierarchyError {
    /// The underlying document store failed while reading.
    #[error("link extraction failed for '{document}': {message}")]
    Extraction {
        /// Document being extracted.
        document: DocumentId,
        /// Store failure description.
        message: String,
    },

    /// Extraction exceeded the fixed ceiling.
    #[error("link extraction for '{document}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Document being extracted.
        document: DocumentId,
        /// Ceiling that was exceeded.
        timeout_ms: u64,
    },
}

impl LinkHierarchyError {
    pub(crate) fn extraction(document: &DocumentId, source: impl Display) -> Self {
        Self::Extraction {
            document: document.clone(),
            message: source.to_string(),
        }
    }

    /// Document the failure belongs to.
    #[must_use]
    pub fn document(&self) -> &DocumentId {
        match self {
            Self::Extraction { document, .. } | Self::Timeout { document, .. } => document,
        }
    }

    /// Whether this is a timeout rather than a store failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
