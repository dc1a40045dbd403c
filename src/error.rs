//! Error types for the capability store.
//!
//! Every operation on the store returns a typed [`Error`] to its immediate
//! caller. Nothing is retried internally.

use std::path::PathBuf;

use crate::storage::EntryId;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The id is unknown or not a well-formed id.
    ///
    /// Both cases share this variant and carry nothing that could tell them
    /// apart.
    #[error("entry not found")]
    NotFound,

    /// A freshly generated id collided with an existing row.
    #[error("duplicate entry id: {id}")]
    DuplicateId { id: EntryId },

    /// Creating an entry failed; any partial state was rolled back.
    #[error("entry creation failed during {stage}")]
    CreationFailed {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The request touches more than one field, addresses more than one
    /// entry, or carries a selection filter.
    #[error("unsupported operation: {reason}")]
    UnsupportedOperation { reason: &'static str },

    /// The backing file for an entry could not be created.
    #[error("failed to allocate backing file at {path:?}: {source}")]
    AllocationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata index failed.
    #[error("metadata index error while trying to {context}: {source}")]
    Index {
        context: &'static str,
        #[source]
        source: redb::Error,
    },

    /// A stored row could not be encoded or decoded.
    #[error("failed to (de)serialize index row: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The index was written by a newer schema than this build understands.
    #[error("index schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u64, supported: u64 },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns a mapper that wraps any redb error with the given context.
    ///
    /// ```ignore
    /// let txn = db.begin_write().map_err(Error::index("begin write"))?;
    /// ```
    pub fn index<E: Into<redb::Error>>(context: &'static str) -> impl FnOnce(E) -> Self {
        move |source| Self::Index {
            context,
            source: source.into(),
        }
    }

    /// Create a creation-failed error for the given stage.
    pub fn creation_failed(stage: &'static str, source: Error) -> Self {
        Self::CreationFailed {
            stage,
            source: Box::new(source),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(reason: &'static str) -> Self {
        Self::UnsupportedOperation { reason }
    }

    /// Returns true for [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
