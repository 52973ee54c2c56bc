//! Error type for access layer operations.
//!
//! A query or get that matches nothing is not an error; see
//! [`crate::query::QueryOutcome`] and [`crate::provider::NoDb::get_record`].

use nodb_model::error::StoreError;
use nodb_model::operations::StoreOperation;

/// Failure of one logical operation.
#[derive(Debug, thiserror::Error)]
pub enum NoDbError {
    /// The caller's input cannot produce a valid request. Raised before any
    /// store call is made.
    #[error("invalid request: {0}")]
    Usage(String),

    /// The store client failed a call. Earlier chunks or pages of the same
    /// operation stay applied.
    #[error("{operation} failed: {source}")]
    Store {
        /// The call kind that failed.
        operation: StoreOperation,
        /// JSON rendering of the failing request.
        request: String,
        /// The store's error.
        #[source]
        source: StoreError,
    },

    /// A batch chain kept receiving unprocessed entries without progress.
    #[error("{operation} gave up with {remaining} entries still unprocessed")]
    UnprocessedItems {
        /// The batch call kind.
        operation: StoreOperation,
        /// Entries neither applied nor read when the chain stopped.
        remaining: usize,
    },
}

impl NoDbError {
    /// Usage error with a message.
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// The store's error, when this failure came from a store call.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience result type for access layer operations.
pub type NoDbResult<T> = Result<T, NoDbError>;
