use std::fmt;

use uuid::Uuid;

use super::error::StorageError;

/// Opaque handle to a stored blob.
///
/// A location is a random UUID rendered as 32 lowercase hex characters. It is
/// generated by the store on every write, so two uploads never share a
/// location even when their names or contents are identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobLocation(Uuid);

impl BlobLocation {
    /// Allocate a fresh, collision-free location.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a location previously produced by [`BlobLocation::as_str`].
    ///
    /// Only the canonical lowercase form is accepted, so a parsed location
    /// always maps to a path inside the store's base directory.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.len() != 32 {
            return Err(StorageError::InvalidLocation(format!(
                "expected 32 hex characters, got {}",
                s.len()
            )));
        }

        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(StorageError::InvalidLocation(
                "expected lowercase hex characters".into(),
            ));
        }

        let uuid = Uuid::try_parse(s)
            .map_err(|e| StorageError::InvalidLocation(format!("invalid location: {e}")))?;

        Ok(Self(uuid))
    }

    /// Return the canonical 32-character string form.
    pub fn as_str(&self) -> String {
        self.0.simple().to_string()
    }

    /// Return the first 2 hex characters (shard directory).
    pub fn shard_prefix(&self) -> String {
        self.as_str()[..2].to_string()
    }

    /// Return the remaining 30 hex characters (filename within shard).
    pub fn shard_suffix(&self) -> String {
        self.as_str()[2..].to_string()
    }
}

impl fmt::Debug for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobLocation({})", self.as_str())
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
