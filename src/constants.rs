//! Application-wide constants
//!
//! Storage keys, notification channel names and reserved profile names are a
//! stable contract shared with the widget's feature modules. Keep them here so
//! nothing else spells them out by hand.

/// Persistent storage layout
pub mod storage {
    /// Prefix applied to every key the widget writes
    pub const PREFIX: &str = "spicy_";

    /// Settings mapping (JSON object of setting id -> bool/int)
    pub const SETTINGS_KEY: &str = "spicySettings";

    /// Profile mapping (JSON object of profile name -> settings mapping)
    pub const PROFILES_KEY: &str = "spicyProfiles";

    /// Reserved key used by the availability probe
    pub const PROBE_KEY: &str = "__storage_test__";

    /// Application directory under the user's config dir
    pub const APP_DIR: &str = "spicy-a11y";

    /// File used by the on-disk backend
    pub const FILENAME: &str = "storage.json";
}

/// Notification bus channels published by the settings manager
pub mod channels {
    /// Every publish is also delivered here, with the channel name attached
    pub const WILDCARD: &str = "*";

    pub const LOADED: &str = "settings:loaded";
    pub const SAVED: &str = "settings:saved";
    pub const CHANGED: &str = "settings:changed";
    pub const RESET: &str = "settings:reset";
    pub const PROFILE_LOADED: &str = "settings:profile:loaded";
    pub const PROFILE_SAVED: &str = "settings:profile:saved";
    pub const PROFILE_DELETED: &str = "settings:profile:deleted";
}

/// Built-in profile names (case-sensitive)
pub mod profiles {
    pub const DEFAULT: &str = "default";
    pub const HIGH_CONTRAST: &str = "highContrast";
    pub const DYSLEXIC: &str = "dyslexic";
    pub const SENIOR: &str = "senior";
    pub const LOW_VISION: &str = "lowVision";
    pub const MOTOR: &str = "motor";
    pub const COGNITIVE: &str = "cognitive";

    /// Every reserved name; none of these can be deleted
    pub const RESERVED: [&str; 7] = [
        DEFAULT,
        HIGH_CONTRAST,
        DYSLEXIC,
        SENIOR,
        LOW_VISION,
        MOTOR,
        COGNITIVE,
    ];
}

/// Value ranges for typed settings
pub mod validation {
    /// Font scale percentage bounds
    pub const MIN_FONT_SIZE: i64 = 80;
    pub const MAX_FONT_SIZE: i64 = 200;

    /// Font scale used when nothing has been changed
    pub const DEFAULT_FONT_SIZE: i64 = 100;
}

/// Environment variables read by [`crate::config::WidgetConfig::from_env`]
pub mod env {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const PREFIX: &str = "SPICY_PREFIX";
    pub const PERSIST: &str = "SPICY_PERSIST";
    pub const STORAGE: &str = "SPICY_STORAGE";
}
