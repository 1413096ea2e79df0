//! Namespaced, best-effort persistent key-value store
//!
//! Wraps a [`StorageBackend`] and guarantees that nothing fails loudly:
//! unavailable storage, quota errors and serialization problems are logged
//! and reported as `false`/`None`. Callers treat persistence as best-effort;
//! in-memory state must never depend on a write succeeding.

mod backend;
mod file;

pub use backend::{MemoryBackend, StorageBackend, UnavailableBackend};
pub use file::FileBackend;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use tracing::{debug, info, warn};

use crate::constants::storage::{PREFIX, PROBE_KEY};

pub struct KeyValueStore {
    backend: Box<dyn StorageBackend>,
    prefix: String,
    /// Result of the probe run at construction
    available: bool,
    /// When false, writes are refused (session-only mode)
    persist: Cell<bool>,
}

impl KeyValueStore {
    /// Wrap `backend`, namespacing keys with `prefix`, and probe it once
    pub fn new(backend: impl StorageBackend + 'static, prefix: impl Into<String>) -> Self {
        let mut store = Self {
            backend: Box::new(backend),
            prefix: prefix.into(),
            available: false,
            persist: Cell::new(true),
        };
        store.available = store.probe();
        if store.available {
            info!(prefix = %store.prefix, "Persistent storage available");
        } else {
            warn!(
                prefix = %store.prefix,
                "Persistent storage unavailable, settings will not survive this session"
            );
        }
        store
    }

    /// Store with the default `spicy_` prefix
    pub fn with_default_prefix(backend: impl StorageBackend + 'static) -> Self {
        Self::new(backend, PREFIX)
    }

    /// Write and delete a reserved test key; `true` if both succeed
    pub fn probe(&self) -> bool {
        let key = self.full_key(PROBE_KEY);
        if let Err(e) = self.backend.set_item(&key, PROBE_KEY) {
            warn!(error = %e, "Storage probe write failed");
            return false;
        }
        if let Err(e) = self.backend.remove_item(&key) {
            warn!(error = %e, "Storage probe cleanup failed");
            return false;
        }
        true
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn persist_enabled(&self) -> bool {
        self.persist.get()
    }

    /// Toggle persist mode; while off, [`Self::set`] refuses every write
    pub fn set_persist(&self, persist: bool) {
        debug!(persist, "Storage persist mode changed");
        self.persist.set(persist);
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.available {
            return None;
        }
        match self.backend.get_item(&self.full_key(key)) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Storage read failed");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> bool {
        if !self.available {
            debug!(key = %key, "Skipping write, storage unavailable");
            return false;
        }
        if !self.persist.get() {
            debug!(key = %key, "Skipping write, persist mode disabled");
            return false;
        }
        match self.backend.set_item(&self.full_key(key), value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, bytes = value.len(), error = %e, "Storage write failed");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        if !self.available {
            return false;
        }
        match self.backend.remove_item(&self.full_key(key)) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Storage remove failed");
                false
            }
        }
    }

    /// Remove every key under our prefix, leaving unrelated keys alone
    pub fn clear(&self) -> bool {
        if !self.available {
            return false;
        }
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Storage clear failed listing keys");
                return false;
            }
        };

        let mut ok = true;
        let mut removed = 0usize;
        for key in keys.iter().filter(|k| k.starts_with(&self.prefix)) {
            match self.backend.remove_item(key) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "Storage clear failed removing key");
                    ok = false;
                }
            }
        }
        info!(removed, prefix = %self.prefix, "Cleared storage");
        ok
    }

    /// Read and deserialize; malformed data is logged and treated as absent
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring malformed stored JSON");
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize value for storage");
                false
            }
        }
    }
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("prefix", &self.prefix)
            .field("available", &self.available)
            .field("persist", &self.persist.get())
            .finish()
    }
}
