//! Tab-scoped draft persistence with expiry and an integrity checksum.
//!
//! The checksum is an unkeyed, truncated SHA-256 of the stored value. It catches accidental
//! corruption and casual edits; anyone able to write the storage can recompute it.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::clock::Clock;
use super::sanitizer::sanitize;

const CHECKSUM_LENGTH: usize = 10;

/// Backing key/value scope that survives a page reload within one tab.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
    #[error("session storage quota exceeded")]
    QuotaExceeded,
    #[error("failed to encode stored entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEnvelope {
    value: String,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    checksum: String,
}

pub(crate) fn checksum(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(CHECKSUM_LENGTH);
    encoded
}

pub struct SecureStore<S> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S> Clone for SecureStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            clock: self.clock.clone(),
            ttl: self.ttl,
        }
    }
}

impl<S> SecureStore<S>
where
    S: SessionStorage,
{
    pub const DEFAULT_TTL_MINUTES: i64 = 60;

    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(storage, clock, Duration::minutes(Self::DEFAULT_TTL_MINUTES))
    }

    pub fn with_ttl(storage: Arc<S>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            storage,
            clock,
            ttl,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Store `value` verbatim under the sanitized `key`.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let envelope = StoredEnvelope {
            value: value.to_string(),
            timestamp: self.clock.now().timestamp_millis(),
            checksum: checksum(value),
        };
        let encoded = serde_json::to_string(&envelope)?;
        self.storage.set(&sanitize(key), encoded)
    }

    /// Read a value back. Expired, tampered or unreadable entries are evicted and read as absent.
    pub fn get_item(&self, key: &str) -> Option<String> {
        let key = sanitize(key);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%key, error = %err, "failed to read session storage");
                return None;
            }
        };

        let envelope: StoredEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%key, error = %err, "suspicious activity: unreadable stored entry");
                self.evict(&key);
                return None;
            }
        };

        let age_ms = self.clock.now().timestamp_millis() - envelope.timestamp;
        if age_ms > self.ttl.num_milliseconds() {
            self.evict(&key);
            return None;
        }

        if envelope.checksum != checksum(&envelope.value) {
            warn!(%key, "suspicious activity: stored entry failed integrity check");
            self.evict(&key);
            return None;
        }

        Some(envelope.value)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove(&sanitize(key))
    }

    /// Evict every entry `get_item` would now reject. Returns the number of keys removed.
    pub fn cleanup(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in self.storage.keys()? {
            if self.get_item(&key).is_none() {
                // get_item already evicted it unless the key itself was not sanitized
                self.storage.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn evict(&self, key: &str) {
        if let Err(err) = self.storage.remove(key) {
            warn!(%key, error = %err, "failed to evict stored entry");
        }
    }
}
