//! Entry identifiers.
//!
//! An [`EntryId`] is a random 128-bit (v4) UUID. Its canonical text form is
//! the lowercase hyphenated rendering, and that is the only text form the
//! store accepts back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::validation::validate_id;
use crate::error::Error;

/// Length of the canonical text form of an id.
pub const ID_TEXT_LEN: usize = 36;

/// Unguessable identifier of one stored entry.
///
/// Possessing the id is the only credential needed to read, type-query or
/// delete the entry it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generates a fresh id from the operating system's CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Writes the canonical text form into `buf` without allocating.
    pub(crate) fn encode<'a>(&self, buf: &'a mut [u8; ID_TEXT_LEN]) -> &'a str {
        self.0.hyphenated().encode_lower(buf)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; ID_TEXT_LEN];
        f.write_str(self.encode(&mut buf))
    }
}

impl FromStr for EntryId {
    type Err = Error;

    /// Parses the canonical text form. Anything else is [`Error::NotFound`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_id(s)
    }
}

/// Deserializes through [`validate_id`], so only the canonical form is accepted.
impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        validate_id(&text).map_err(|_| serde::de::Error::custom("malformed entry id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_display_is_canonical() {
        let id = EntryId::generate();
        let text = id.to_string();

        assert_eq!(text.len(), ID_TEXT_LEN);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(text.parse::<EntryId>().unwrap(), id);
    }

    #[test]
    fn test_generated_ids_are_v4() {
        let id = EntryId::generate();
        assert_eq!(id.0.get_version_num(), 4);
    }

    #[test]
    fn test_ten_thousand_distinct_ids() {
        let ids: HashSet<EntryId> = (0..10_000).map(|_| EntryId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_serde_uses_text_form() {
        let id = EntryId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_deserialize_accepts_only_canonical_text() {
        let id = validate_id("6f1c1d2e-4b7a-4c53-9a0e-2f3b4c5d6e7f").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<EntryId>(&json).unwrap(), id);

        let upper = format!("\"{}\"", id.to_string().to_uppercase());
        let simple = format!("\"{}\"", id.0.simple());
        let braced = format!("\"{}\"", id.0.braced());
        for text in [upper, simple, braced] {
            assert!(serde_json::from_str::<EntryId>(&text).is_err(), "{text}");
        }
    }
}
