use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque reference to a stored blob.
///
/// Handles carry no information about the blob's content; each `put`
/// mints a fresh one, so two identical payloads stored twice occupy
/// two distinct blobs. Ownership of a handle is exclusive to the
/// record that holds it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle([u8; 16]);

impl BlobHandle {
    /// Mint a new random handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Parse a hex-encoded handle string.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        if s.len() != 32 {
            return Err(StorageError::InvalidHandle(format!(
                "expected 32 hex characters, got {}",
                s.len()
            )));
        }

        let bytes = hex::decode(s)
            .map_err(|e| StorageError::InvalidHandle(format!("invalid hex: {e}")))?;

        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidHandle("decoded to wrong length".into()))?;

        Ok(Self(arr))
    }

    /// Return the handle as a 32-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Return the first 2 hex characters (shard prefix for filesystem layout).
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Return the remaining 30 hex characters (filename within shard).
    pub fn shard_suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.to_hex())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for BlobHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlobHandle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
