//! Built-in defaults and preset profiles
//!
//! `default` mirrors [`default_settings`] exactly and can never be
//! overwritten or deleted. The other presets are reserved names too: they
//! can be re-saved but not deleted.

use tracing::{info, warn};

use super::schema::SettingId;
use super::value::{ProfileMap, SettingValue, SettingsMap};
use crate::constants::profiles::{
    COGNITIVE, DEFAULT, DYSLEXIC, HIGH_CONTRAST, LOW_VISION, MOTOR, RESERVED, SENIOR,
};

/// Fresh copy of the built-in settings mapping
pub fn default_settings() -> SettingsMap {
    SettingId::ALL
        .into_iter()
        .map(|id| (id.key().to_string(), id.default_value()))
        .collect()
}

/// Defaults with `overrides` applied
fn preset(overrides: &[(SettingId, SettingValue)]) -> SettingsMap {
    let mut settings = default_settings();
    for (id, value) in overrides {
        settings.insert(id.key().to_string(), *value);
    }
    settings
}

/// The fixed set of built-in profiles, keyed by reserved name
pub fn builtin_profiles() -> ProfileMap {
    use SettingId::*;
    use SettingValue::{Bool, Int};

    let mut profiles = ProfileMap::new();
    profiles.insert(DEFAULT.to_string(), default_settings());
    profiles.insert(
        HIGH_CONTRAST.to_string(),
        preset(&[
            (Contrast, Bool(true)),
            (HighlightLinks, Bool(true)),
            (FocusIndicator, Bool(true)),
        ]),
    );
    profiles.insert(
        DYSLEXIC.to_string(),
        preset(&[
            (DyslexicFont, Bool(true)),
            (LineHeight, Bool(true)),
            (LetterSpacing, Bool(true)),
            (ReadingGuide, Bool(true)),
        ]),
    );
    profiles.insert(
        SENIOR.to_string(),
        preset(&[
            (FontSize, Int(130)),
            (LineHeight, Bool(true)),
            (BigCursor, Bool(true)),
            (HighlightLinks, Bool(true)),
        ]),
    );
    profiles.insert(
        LOW_VISION.to_string(),
        preset(&[
            (FontSize, Int(150)),
            (Contrast, Bool(true)),
            (BigCursor, Bool(true)),
            (FocusIndicator, Bool(true)),
            (TextToSpeech, Bool(true)),
        ]),
    );
    profiles.insert(
        MOTOR.to_string(),
        preset(&[
            (BigCursor, Bool(true)),
            (FocusIndicator, Bool(true)),
            (PauseAnimations, Bool(true)),
        ]),
    );
    profiles.insert(
        COGNITIVE.to_string(),
        preset(&[
            (PauseAnimations, Bool(true)),
            (HideImages, Bool(true)),
            (ReadingGuide, Bool(true)),
            (PageStructure, Bool(true)),
            (Tooltips, Bool(true)),
        ]),
    );
    profiles
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Insert any default key missing from `settings`; returns how many were added
pub fn backfill(settings: &mut SettingsMap) -> usize {
    let mut added = 0;
    for (key, value) in default_settings() {
        if !settings.contains_key(&key) {
            settings.insert(key, value);
            added += 1;
        }
    }
    added
}

/// Bring a persisted profile mapping back in line with the built-ins
///
/// Missing presets are reinstated, `default` is forced back to the built-in
/// defaults, and every profile gets missing default keys backfilled.
pub fn reconcile(profiles: &mut ProfileMap) {
    for (name, builtin) in builtin_profiles() {
        match profiles.get(&name) {
            None => {
                info!(profile = %name, "Reinstating missing built-in profile");
                profiles.insert(name, builtin);
            }
            Some(stored) if name == DEFAULT && *stored != builtin => {
                warn!("Stored default profile differs from built-in defaults, restoring it");
                profiles.insert(name, builtin);
            }
            Some(_) => {}
        }
    }

    for (name, settings) in profiles.iter_mut() {
        let added = backfill(settings);
        if added > 0 {
            info!(profile = %name, added, "Backfilled missing keys in profile");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_has_required_keys() {
        let defaults = default_settings();
        assert_eq!(defaults.len(), 17);
        assert_eq!(defaults.get("fontSize"), Some(&SettingValue::Int(100)));
        for key in [
            "lineHeight",
            "letterSpacing",
            "dyslexicFont",
            "contrast",
            "darkMode",
            "lightMode",
            "grayscale",
            "highlightLinks",
            "readingGuide",
            "hideImages",
            "pauseAnimations",
            "bigCursor",
            "focusIndicator",
            "pageStructure",
            "textToSpeech",
            "tooltips",
        ] {
            assert_eq!(defaults.get(key), Some(&SettingValue::Bool(false)), "{key}");
        }
    }

    #[test]
    fn test_builtin_profiles_are_exactly_the_reserved_names() {
        let profiles = builtin_profiles();
        let mut names: Vec<&str> = profiles.keys().map(String::as_str).collect();
        let mut reserved = RESERVED.to_vec();
        names.sort();
        reserved.sort();
        assert_eq!(names, reserved);
        assert_eq!(profiles[DEFAULT], default_settings());
    }

    #[test]
    fn test_presets_are_complete_and_valid() {
        for (name, settings) in builtin_profiles() {
            for id in SettingId::ALL {
                let value = settings.get(id.key()).copied();
                assert!(value.is_some(), "{name} missing {id}");
                assert!(id.validate(value.unwrap()).is_ok(), "{name} has invalid {id}");
            }
        }
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("default"));
        assert!(is_reserved("cognitive"));
        assert!(!is_reserved("Default"));
        assert!(!is_reserved("mine"));
    }

    #[test]
    fn test_backfill_keeps_existing_values() {
        let mut settings = SettingsMap::new();
        settings.insert("fontSize".to_string(), SettingValue::Int(150));
        settings.insert("custom".to_string(), SettingValue::Bool(true));

        assert_eq!(backfill(&mut settings), 16);
        assert_eq!(settings.get("fontSize"), Some(&SettingValue::Int(150)));
        assert_eq!(settings.get("custom"), Some(&SettingValue::Bool(true)));
        assert_eq!(backfill(&mut settings), 0);
    }

    #[test]
    fn test_reconcile_restores_builtins_and_keeps_custom() {
        let mut tampered = default_settings();
        tampered.insert("fontSize".to_string(), SettingValue::Int(180));

        let mut partial = SettingsMap::new();
        partial.insert("darkMode".to_string(), SettingValue::Bool(true));

        let mut profiles = ProfileMap::new();
        profiles.insert(DEFAULT.to_string(), tampered);
        profiles.insert("mine".to_string(), partial);

        reconcile(&mut profiles);

        assert_eq!(profiles.len(), 8);
        assert_eq!(profiles[DEFAULT], default_settings());
        assert_eq!(profiles["mine"].get("darkMode"), Some(&SettingValue::Bool(true)));
        assert_eq!(profiles["mine"].get("fontSize"), Some(&SettingValue::Int(100)));
    }

    #[test]
    fn test_reconcile_keeps_resaved_presets() {
        let mut senior = default_settings();
        senior.insert("fontSize".to_string(), SettingValue::Int(170));
        let mut profiles = builtin_profiles();
        profiles.insert(SENIOR.to_string(), senior.clone());

        reconcile(&mut profiles);
        assert_eq!(profiles[SENIOR], senior);
    }
}
