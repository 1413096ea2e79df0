//! Raw storage backends
//!
//! A backend is the host-provided persistent store (browser local storage,
//! a file on disk, an in-memory map). Backends report failures through
//! `anyhow::Result`; [`super::KeyValueStore`] turns those into log lines and
//! booleans so nothing above it ever sees an error.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Host-provided string key-value store
pub trait StorageBackend {
    /// Value for `key`, `Ok(None)` if absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    /// Every key currently stored, prefixed or not
    fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    items: BTreeMap<String, String>,
    /// Max total bytes (keys + values); `None` = unlimited
    quota: Option<usize>,
    failing: bool,
}

impl MemoryState {
    fn used_bytes(&self) -> usize {
        self.items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// In-process backend
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what a [`super::KeyValueStore`] wrote through another clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total stored bytes; writes that would exceed it fail
    pub fn set_quota(&self, quota: Option<usize>) {
        self.state.borrow_mut().quota = quota;
    }

    /// Make every operation fail, like storage blocked in private browsing
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    /// Raw value, bypassing failure simulation
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state.borrow().items.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        if state.failing {
            bail!("storage access denied");
        }
        Ok(state.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            bail!("storage access denied");
        }
        if let Some(quota) = state.quota {
            let existing = state.items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = state.used_bytes() - existing + key.len() + value.len();
            if needed > quota {
                bail!("quota exceeded: {} bytes needed, {} allowed", needed, quota);
            }
        }
        state.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            bail!("storage access denied");
        }
        state.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let state = self.state.borrow();
        if state.failing {
            bail!("storage access denied");
        }
        Ok(state.items.keys().cloned().collect())
    }
}

/// Backend for hosts with no persistent store at all
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl StorageBackend for UnavailableBackend {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        bail!("persistent storage unavailable")
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        bail!("persistent storage unavailable")
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        bail!("persistent storage unavailable")
    }

    fn keys(&self) -> Result<Vec<String>> {
        bail!("persistent storage unavailable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set_item("a", "1").unwrap();
        assert_eq!(backend.get_item("a").unwrap(), Some("1".to_string()));

        backend.remove_item("a").unwrap();
        assert_eq!(backend.get_item("a").unwrap(), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_memory_backend_clones_share_state() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.set_item("shared", "yes").unwrap();
        assert_eq!(other.peek("shared"), Some("yes".to_string()));
    }

    #[test]
    fn test_memory_backend_quota() {
        let backend = MemoryBackend::new();
        backend.set_quota(Some(10));

        // "key" + "12345" = 8 bytes, fits
        backend.set_item("key", "12345").unwrap();
        // overwriting the same key only counts the new value
        backend.set_item("key", "1234567").unwrap();
        // a second entry would exceed the quota
        assert!(backend.set_item("k2", "xx").is_err());
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_memory_backend_failing() {
        let backend = MemoryBackend::new();
        backend.set_item("a", "1").unwrap();
        backend.set_failing(true);

        assert!(backend.get_item("a").is_err());
        assert!(backend.set_item("b", "2").is_err());
        assert!(backend.remove_item("a").is_err());
        assert!(backend.keys().is_err());

        // peek bypasses the simulated failure
        assert_eq!(backend.peek("a"), Some("1".to_string()));
    }

    #[test]
    fn test_unavailable_backend_always_errors() {
        let backend = UnavailableBackend;
        assert!(backend.get_item("a").is_err());
        assert!(backend.set_item("a", "1").is_err());
        assert!(backend.remove_item("a").is_err());
        assert!(backend.keys().is_err());
    }
}
