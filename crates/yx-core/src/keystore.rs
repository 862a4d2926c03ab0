//! Key provisioning.
//!
//! Maps each known GUID to its 32-byte symmetric key, falling back to a
//! process-wide default when no mapping exists. Keys are provisioned
//! out-of-band (no key exchange is implemented here) and are immutable for
//! the life of a mapping; reload replaces the whole snapshot atomically so
//! concurrent readers never observe a half-updated table.

use std::{collections::HashMap, sync::Arc, sync::RwLock};

use yx_proto::Guid;

use crate::error::{Result, YxError};

/// Length of a symmetric key in bytes.
pub const KEY_SIZE: usize = yx_crypto::KEY_SIZE;

/// A 32-byte symmetric key.
pub type Key = [u8; KEY_SIZE];

struct Snapshot {
    keys: HashMap<Guid, Key>,
    default_key: Key,
}

/// Maps sender GUIDs to symmetric keys, with a default fallback.
///
/// Readers take a cheap `Arc` clone of the current snapshot; reconfiguration
/// (`reload`) builds a new snapshot and swaps it in atomically, so readers
/// never observe a partially-updated table.
pub struct KeyStore {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl KeyStore {
    /// Create a key store with only a default key (no per-GUID overrides).
    ///
    /// # Errors
    ///
    /// Returns [`YxError::Config`] if `default_key` is not exactly
    /// [`KEY_SIZE`] bytes - expressed here as a fixed-size parameter, so in
    /// practice this only guards future callers that might relax the type.
    pub fn new(default_key: Key) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot { keys: HashMap::new(), default_key })),
        }
    }

    /// Replace the entire key table atomically.
    ///
    /// # Errors
    ///
    /// Returns [`YxError::Config`] if any provided key is not [`KEY_SIZE`]
    /// bytes. Construction from raw byte slices is the only path where this
    /// can actually fail; see [`KeyStore::from_slices`].
    pub fn reload(&self, keys: HashMap<Guid, Key>, default_key: Key) {
        let snapshot = Arc::new(Snapshot { keys, default_key });
        let mut guard = self.snapshot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = snapshot;
    }

    /// Build a key store from raw byte slices, validating lengths.
    ///
    /// # Errors
    ///
    /// Returns [`YxError::Config`] if the default key or any per-GUID key is
    /// not exactly [`KEY_SIZE`] bytes.
    pub fn from_slices(
        keys: &HashMap<Guid, Vec<u8>>,
        default_key: &[u8],
    ) -> Result<Self> {
        let default_key = to_key(default_key)?;
        let mut table = HashMap::with_capacity(keys.len());
        for (guid, key) in keys {
            table.insert(*guid, to_key(key)?);
        }
        Ok(Self::new(default_key).with_table(table, default_key))
    }

    fn with_table(self, keys: HashMap<Guid, Key>, default_key: Key) -> Self {
        self.reload(keys, default_key);
        self
    }

    /// Look up the key for `guid`, falling back to the default key.
    #[must_use]
    pub fn get(&self, guid: &Guid) -> Key {
        let snapshot = self.snapshot.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        *snapshot.keys.get(guid).unwrap_or(&snapshot.default_key)
    }
}

fn to_key(bytes: &[u8]) -> Result<Key> {
    Key::try_from(bytes)
        .map_err(|_| YxError::Config(format!("key must be {KEY_SIZE} bytes, got {}", bytes.len())))
}
