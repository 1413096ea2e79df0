//! Accessibility settings and profiles
//!
//! - **value**: stored value type and the open-keyed mappings
//! - **schema**: closed set of known settings with typed validation
//! - **profile**: built-in defaults and preset profiles
//! - **event**: payloads published on the notification bus
//! - **manager**: the settings/profile manager itself

pub mod event;
pub mod manager;
pub mod profile;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use event::{ChangeDetail, SettingsEvent, SettingsView};
pub use manager::SettingsManager;
pub use profile::{builtin_profiles, default_settings, is_reserved};
pub use schema::{SchemaError, SettingId, SettingKind};
pub use value::{ProfileMap, SettingValue, SettingsMap};
