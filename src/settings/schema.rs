//! Typed view of the known settings
//!
//! The manager stores an open string-keyed map so profiles can carry keys it
//! does not know about. Feature modules and the CLI go through [`SettingId`]
//! instead, which pins each known setting to a kind and validates values
//! before they reach the map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::value::SettingValue;
use crate::constants::validation::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingId {
    FontSize,
    LineHeight,
    LetterSpacing,
    DyslexicFont,
    Contrast,
    DarkMode,
    LightMode,
    Grayscale,
    HighlightLinks,
    ReadingGuide,
    HideImages,
    PauseAnimations,
    BigCursor,
    FocusIndicator,
    PageStructure,
    TextToSpeech,
    Tooltips,
}

/// Shape of the values a setting accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Toggle,
    Percent { min: i64, max: i64 },
}

impl SettingId {
    pub const ALL: [SettingId; 17] = [
        SettingId::FontSize,
        SettingId::LineHeight,
        SettingId::LetterSpacing,
        SettingId::DyslexicFont,
        SettingId::Contrast,
        SettingId::DarkMode,
        SettingId::LightMode,
        SettingId::Grayscale,
        SettingId::HighlightLinks,
        SettingId::ReadingGuide,
        SettingId::HideImages,
        SettingId::PauseAnimations,
        SettingId::BigCursor,
        SettingId::FocusIndicator,
        SettingId::PageStructure,
        SettingId::TextToSpeech,
        SettingId::Tooltips,
    ];

    /// Storage key, also the name used on the notification bus
    pub fn key(self) -> &'static str {
        match self {
            SettingId::FontSize => "fontSize",
            SettingId::LineHeight => "lineHeight",
            SettingId::LetterSpacing => "letterSpacing",
            SettingId::DyslexicFont => "dyslexicFont",
            SettingId::Contrast => "contrast",
            SettingId::DarkMode => "darkMode",
            SettingId::LightMode => "lightMode",
            SettingId::Grayscale => "grayscale",
            SettingId::HighlightLinks => "highlightLinks",
            SettingId::ReadingGuide => "readingGuide",
            SettingId::HideImages => "hideImages",
            SettingId::PauseAnimations => "pauseAnimations",
            SettingId::BigCursor => "bigCursor",
            SettingId::FocusIndicator => "focusIndicator",
            SettingId::PageStructure => "pageStructure",
            SettingId::TextToSpeech => "textToSpeech",
            SettingId::Tooltips => "tooltips",
        }
    }

    pub fn kind(self) -> SettingKind {
        match self {
            SettingId::FontSize => SettingKind::Percent {
                min: MIN_FONT_SIZE,
                max: MAX_FONT_SIZE,
            },
            _ => SettingKind::Toggle,
        }
    }

    pub fn default_value(self) -> SettingValue {
        match self.kind() {
            SettingKind::Toggle => SettingValue::Bool(false),
            SettingKind::Percent { .. } => SettingValue::Int(DEFAULT_FONT_SIZE),
        }
    }

    /// Check `value` against this setting's kind
    pub fn validate(self, value: SettingValue) -> Result<SettingValue, SchemaError> {
        match (self.kind(), value) {
            (SettingKind::Toggle, SettingValue::Bool(_)) => Ok(value),
            (SettingKind::Percent { min, max }, SettingValue::Int(n)) => {
                if (min..=max).contains(&n) {
                    Ok(value)
                } else {
                    Err(SchemaError::OutOfRange {
                        id: self,
                        value: n,
                        min,
                        max,
                    })
                }
            }
            (kind, _) => Err(SchemaError::WrongType {
                id: self,
                expected: kind,
                got: value,
            }),
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SettingId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingId::ALL
            .into_iter()
            .find(|id| id.key() == s)
            .ok_or_else(|| SchemaError::UnknownSetting(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    UnknownSetting(String),
    WrongType {
        id: SettingId,
        expected: SettingKind,
        got: SettingValue,
    },
    OutOfRange {
        id: SettingId,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownSetting(key) => write!(f, "unknown setting '{key}'"),
            SchemaError::WrongType { id, expected, got } => match expected {
                SettingKind::Toggle => write!(f, "{id} expects true/false, got {got}"),
                SettingKind::Percent { min, max } => {
                    write!(f, "{id} expects an integer in {min}..={max}, got {got}")
                }
            },
            SchemaError::OutOfRange { id, value, min, max } => {
                write!(f, "{id} must be within {min}..={max}, got {value}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
