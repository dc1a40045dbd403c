//! Types for the storage service.

use std::fs::{File, OpenOptions};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::EntryId;
use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::error::Error;

/// Metadata row for one stored entry.
///
/// The entry's size is not stored; it is read from the backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Capability id, also the file-store key
    pub id: EntryId,
    /// Optional display name, fixed at creation
    pub name: Option<String>,
    /// Optional MIME type
    pub content_type: Option<String>,
    /// Creation time, used only for expiry
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Returns the content type, or `application/octet-stream` if unset.
    #[must_use]
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub(crate) fn from_stored(id: EntryId, stored: StoredEntry) -> Self {
        Self {
            id,
            name: stored.name,
            content_type: stored.content_type,
            created_at: stored.created_at,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredEntry {
        StoredEntry {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            created_at: self.created_at,
        }
    }
}

/// Serialized row value in the metadata index (schema version 2).
///
/// The id is the row key and is not repeated in the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata of a live entry, with its size read from the backing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub name: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
}

/// A resolved entry: its metadata plus a read-only handle to its bytes.
#[derive(Debug)]
pub struct Resolved {
    pub name: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
    pub file: File,
}

/// How a backing file is opened.
///
/// Mirrors the conventional mode strings `r`, `w`, `wt`, `wa`, `rw` and
/// `rwt`. No mode creates a file: backing files only come into existence
/// through entry creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// `r`
    Read,
    /// `w`: write from the start without truncating
    Write,
    /// `wt`
    WriteTruncate,
    /// `wa`
    WriteAppend,
    /// `rw`
    ReadWrite,
    /// `rwt`
    ReadWriteTruncate,
}

impl AccessMode {
    /// Returns true if the mode allows writing.
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Read)
    }

    pub(crate) fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::Write => options.write(true),
            Self::WriteTruncate => options.write(true).truncate(true),
            Self::WriteAppend => options.append(true),
            Self::ReadWrite => options.read(true).write(true),
            Self::ReadWriteTruncate => options.read(true).write(true).truncate(true),
        };
        options
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "wt" => Ok(Self::WriteTruncate),
            "wa" => Ok(Self::WriteAppend),
            "rw" => Ok(Self::ReadWrite),
            "rwt" => Ok(Self::ReadWriteTruncate),
            _ => Err(Error::unsupported("unknown access mode")),
        }
    }
}
