//! Request shapes accepted by the gateway's generic entry points.
//!
//! A transport in front of the store (an IPC bridge, a content-resolver
//! shim) forwards requests as "which rows" plus "which fields". The store
//! accepts exactly one shape per operation: a bare id, and for updates a
//! single content-type field. Every other shape is rejected with
//! [`Error::UnsupportedOperation`] before any row is touched.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// The rows a request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No id at all: the whole collection.
    Collection,
    /// One entry, named by its id text.
    Entry(String),
    /// An optional id plus a selection predicate.
    Filtered {
        id: Option<String>,
        selection: String,
    },
}

impl Scope {
    /// Scope addressing one entry by id text.
    pub fn entry(id: impl Into<String>) -> Self {
        Self::Entry(id.into())
    }

    /// Returns the bare id text, rejecting any other shape.
    pub(crate) fn require_entry(&self) -> Result<&str> {
        match self {
            Self::Entry(id) => Ok(id.as_str()),
            Self::Collection => Err(Error::unsupported("listing entries is not allowed")),
            Self::Filtered { .. } => Err(Error::unsupported(
                "selection filters are not allowed, only a bare id",
            )),
        }
    }
}

/// Columns of an entry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    Name,
    ContentType,
    CreatedAt,
}

/// Field values carried by an update request.
///
/// `None` means the field is set to null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    fields: BTreeMap<Field, Option<String>>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    #[must_use]
    pub fn set(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields.insert(field, Some(value.into()));
        self
    }

    /// Sets `field` to null.
    #[must_use]
    pub fn clear(mut self, field: Field) -> Self {
        self.fields.insert(field, None);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the new content type if the request changes that field and
    /// nothing else.
    pub(crate) fn require_content_type(&self) -> Result<&str> {
        if self.fields.len() != 1 {
            return Err(Error::unsupported(
                "update supported only for the content type field",
            ));
        }
        match self.fields.get(&Field::ContentType) {
            Some(Some(content_type)) => Ok(content_type.as_str()),
            Some(None) => Err(Error::unsupported("content type can be set, not cleared")),
            None => Err(Error::unsupported(
                "update supported only for the content type field",
            )),
        }
    }
}
