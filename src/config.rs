//! Runtime configuration and logging setup
//!
//! Defaults can be overridden through environment variables, the same way
//! for the CLI and for embedding hosts:
//!
//! | Variable        | Meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `LOG_LEVEL`     | trace / debug / info / warn / error       |
//! | `SPICY_PREFIX`  | storage key prefix (default `spicy_`)     |
//! | `SPICY_PERSIST` | `0`/`false`/`off` keeps settings in memory |
//! | `SPICY_STORAGE` | path of the storage file                  |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{Level, warn};
use tracing_subscriber::FmtSubscriber;

use crate::constants::{env as vars, storage};
use crate::storage::FileBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub storage_prefix: String,
    /// When false, nothing is written to storage
    pub persist: bool,
    /// `None` = `<config dir>/spicy-a11y/storage.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            storage_prefix: storage::PREFIX.to_string(),
            persist: true,
            storage_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl WidgetConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| env::var(name).ok());
        config
    }

    /// Apply overrides from `lookup` (an env var reader in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(vars::LOG_LEVEL) {
            self.log_level = level.trim().to_lowercase();
        }
        if let Some(prefix) = lookup(vars::PREFIX) {
            if prefix.is_empty() {
                warn!(var = vars::PREFIX, "Ignoring empty storage prefix");
            } else {
                self.storage_prefix = prefix;
            }
        }
        if let Some(raw) = lookup(vars::PERSIST) {
            match parse_flag(&raw) {
                Some(persist) => self.persist = persist,
                None => warn!(
                    var = vars::PERSIST,
                    value = %raw,
                    "Unrecognised flag value, keeping default"
                ),
            }
        }
        if let Some(path) = lookup(vars::STORAGE).filter(|p| !p.trim().is_empty()) {
            self.storage_path = Some(PathBuf::from(path));
        }
    }

    /// Storage file in use
    pub fn resolved_storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(FileBackend::default_path)
    }

    pub fn level(&self) -> Level {
        parse_level(&self.log_level)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Level named by `LOG_LEVEL` alone
///
/// Lets logging be installed before [`WidgetConfig::apply_overrides`] runs,
/// so its warnings are not lost.
pub fn level_from(lookup: impl Fn(&str) -> Option<String>) -> Level {
    lookup(vars::LOG_LEVEL).map_or(Level::INFO, |raw| parse_level(&raw))
}

/// Unknown names fall back to `info`
pub fn parse_level(raw: &str) -> Level {
    match raw.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global `tracing` subscriber; logs go to stderr
pub fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.storage_prefix, "spicy_");
        assert!(config.persist);
        assert_eq!(config.storage_path, None);
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let mut config = WidgetConfig::default();
        config.apply_overrides(lookup(&[
            ("LOG_LEVEL", " DEBUG "),
            ("SPICY_PREFIX", "acme_"),
            ("SPICY_PERSIST", "off"),
            ("SPICY_STORAGE", "/tmp/a11y.json"),
        ]));
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.storage_prefix, "acme_");
        assert!(!config.persist);
        assert_eq!(config.resolved_storage_path(), PathBuf::from("/tmp/a11y.json"));
    }

    #[test]
    fn test_bad_overrides_keep_defaults() {
        let mut config = WidgetConfig::default();
        config.apply_overrides(lookup(&[
            ("SPICY_PREFIX", ""),
            ("SPICY_PERSIST", "sometimes"),
            ("SPICY_STORAGE", "  "),
        ]));
        assert_eq!(config, WidgetConfig::default());
    }

    #[test]
    fn test_parse_level_fallback() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_level_readable_before_other_overrides() {
        let env = lookup(&[("LOG_LEVEL", "warn"), ("SPICY_PERSIST", "sometimes")]);
        assert_eq!(level_from(&env), Level::WARN);
        assert_eq!(level_from(lookup(&[])), Level::INFO);

        let mut config = WidgetConfig::default();
        config.apply_overrides(env);
        assert_eq!(config.level(), level_from(lookup(&[("LOG_LEVEL", "warn")])));
        assert!(config.persist);
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let config: WidgetConfig = serde_json::from_str(r#"{"persist":false}"#).unwrap();
        assert!(!config.persist);
        assert_eq!(config.storage_prefix, "spicy_");
    }
}
