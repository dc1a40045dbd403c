//! Id validation and file placement for the storage service.
//!
//! Ids arrive from callers as text. They are checked against the exact
//! canonical format before being parsed, and only a parsed [`EntryId`] is
//! ever turned into a filesystem path. This keeps path construction
//! independent of whatever sanitization the surrounding transport does.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::id::{EntryId, ID_TEXT_LEN};
use crate::error::{Error, Result};

/// Byte offsets of the hyphens in the canonical id text.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// Validates id text and parses it into an [`EntryId`].
///
/// Accepts only the 36-character lowercase hyphenated UUID form. Braced,
/// URN, simple (no hyphens) and uppercase renderings are rejected, as is
/// anything containing path separators, dots or control characters.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for any malformed input, matching the error
/// an unknown but well-formed id produces.
///
/// # Examples
/// ```
/// use capstore::storage::validate_id;
///
/// assert!(validate_id("6f1c1d2e-4b7a-4c53-9a0e-2f3b4c5d6e7f").is_ok());
/// assert!(validate_id("../index.redb").is_err());
/// assert!(validate_id("6F1C1D2E-4B7A-4C53-9A0E-2F3B4C5D6E7F").is_err());
/// ```
pub fn validate_id(text: &str) -> Result<EntryId> {
    if !is_canonical(text) {
        return Err(Error::NotFound);
    }

    Uuid::parse_str(text)
        .map(EntryId::from_uuid)
        .map_err(|_| Error::NotFound)
}

fn is_canonical(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != ID_TEXT_LEN {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| {
        if HYPHENS.contains(&i) {
            *b == b'-'
        } else {
            b.is_ascii_digit() || (b'a'..=b'f').contains(b)
        }
    })
}

/// Returns the backing file path for an entry.
///
/// The file name is the canonical id text and nothing else, so the location
/// cannot be derived from anything but the id.
pub(crate) fn object_path(files_dir: &Path, id: &EntryId) -> PathBuf {
    files_dir.join(id.to_string())
}
