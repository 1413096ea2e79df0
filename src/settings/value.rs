use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A stored setting: a flag or a small integer (font scale percentage etc.)
///
/// Serialized untagged, so the JSON is plain `true` / `150`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
}

/// Open-keyed settings mapping; keys are setting ids such as `fontSize`
pub type SettingsMap = BTreeMap<String, SettingValue>;

/// Named settings mappings
pub type ProfileMap = BTreeMap<String, SettingsMap>;

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(*n),
            SettingValue::Bool(_) => None,
        }
    }

    /// Truthiness used by feature modules: `true` or any non-zero number
    pub fn is_on(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Int(n) => *n != 0,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError(String);

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is neither a boolean nor an integer", self.0)
    }
}

impl std::error::Error for ParseValueError {}

impl FromStr for SettingValue {
    type Err = ParseValueError;

    /// Accepts `true`/`false`/`on`/`off` (any case) or a decimal integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "on" => return Ok(SettingValue::Bool(true)),
            "false" | "off" => return Ok(SettingValue::Bool(false)),
            _ => {}
        }
        trimmed
            .parse::<i64>()
            .map(SettingValue::Int)
            .map_err(|_| ParseValueError(s.to_string()))
    }
}
