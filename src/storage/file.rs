//! On-disk backend: one JSON object of string keys to string values

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::backend::StorageBackend;
use crate::constants::storage::{APP_DIR, FILENAME};

/// File-backed store used by the CLI and desktop hosts
///
/// Every call reads the whole file and writes it back. There is no locking:
/// two processes writing at once means last write wins.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/spicy-a11y/storage.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read storage file {:?}", self.path))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse storage file {:?}", self.path))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(map).context("Failed to serialize storage map")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write storage file {:?}", self.path))?;
        debug!(path = %self.path.display(), entries = map.len(), "Wrote storage file");
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("spicy-a11y-test-{}-{}", std::process::id(), name))
            .join(FILENAME)
    }

    #[test]
    fn test_default_path_ends_with_app_file() {
        let path = FileBackend::default_path();
        assert!(path.ends_with(Path::new(APP_DIR).join(FILENAME)));
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let backend = FileBackend::new(temp_path("missing"));
        assert_eq!(backend.get_item("anything").unwrap(), None);
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_roundtrip_creates_parent_dir() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        let backend = FileBackend::new(&path);
        backend.set_item("spicy_a", "1").unwrap();
        backend.set_item("other", "2").unwrap();
        assert!(path.exists());

        // a fresh handle sees what the first one wrote
        let reopened = FileBackend::new(&path);
        assert_eq!(reopened.get_item("spicy_a").unwrap(), Some("1".to_string()));
        assert_eq!(reopened.keys().unwrap(), vec!["other".to_string(), "spicy_a".to_string()]);

        reopened.remove_item("spicy_a").unwrap();
        assert_eq!(backend.get_item("spicy_a").unwrap(), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let backend = FileBackend::new(&path);
        assert!(backend.get_item("a").is_err());
        assert!(backend.set_item("a", "1").is_err());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
