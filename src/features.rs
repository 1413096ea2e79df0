//! Mutually exclusive settings
//!
//! The settings manager stores whatever it is given. Feature modules own the
//! rules about which settings cannot be on together; this one enforces a
//! table of exclusive groups by listening to `settings:changed` and turning
//! the other members of a group off.

use std::rc::{Rc, Weak};
use tracing::{debug, info};

use crate::bus::{EventBus, Subscription};
use crate::constants::channels;
use crate::settings::{
    ChangeDetail, SettingId, SettingValue, SettingsEvent, SettingsManager, SettingsMap,
};

/// Groups of settings of which at most one may be on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusivityPolicy {
    groups: Vec<Vec<String>>,
}

impl Default for ExclusivityPolicy {
    /// `darkMode` and `lightMode` exclude each other
    fn default() -> Self {
        Self::empty().with_group([SettingId::DarkMode.key(), SettingId::LightMode.key()])
    }
}

impl ExclusivityPolicy {
    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// Add a group; earlier members win when a batch turns several on
    pub fn with_group<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group: Vec<String> = keys.into_iter().map(Into::into).collect();
        if group.len() > 1 {
            self.groups.push(group);
        }
        self
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Settings to switch off so that each group keeps only one member on
    ///
    /// `turned_on` are the keys the change enabled; `current` is the mapping
    /// now. A key another handler has switched off again since does not win.
    pub fn resolve(&self, turned_on: &[&str], current: &SettingsMap) -> SettingsMap {
        let is_on = |key: &str| current.get(key).is_some_and(SettingValue::is_on);
        let mut off = SettingsMap::new();
        for group in &self.groups {
            let Some(winner) = group
                .iter()
                .find(|k| turned_on.contains(&k.as_str()) && is_on(k.as_str()))
            else {
                continue;
            };
            for key in group.iter().filter(|k| *k != winner) {
                if is_on(key.as_str()) {
                    off.insert(key.clone(), SettingValue::Bool(false));
                }
            }
        }
        off
    }
}

/// Feature module applying an [`ExclusivityPolicy`]
pub struct ExclusiveSettings {
    subscription: Subscription<SettingsEvent>,
}

impl ExclusiveSettings {
    pub fn attach(
        manager: &Rc<SettingsManager>,
        bus: &EventBus<SettingsEvent>,
        policy: ExclusivityPolicy,
    ) -> Self {
        let manager: Weak<SettingsManager> = Rc::downgrade(manager);
        info!(groups = policy.groups().len(), "Attaching exclusive settings policy");

        let subscription = bus.subscribe(channels::CHANGED, move |event| {
            let SettingsEvent::Changed { settings, detail } = event.payload else {
                return Ok(());
            };
            let turned_on: Vec<&str> = match detail {
                ChangeDetail::Single { key, value } if value.is_on() => vec![key.as_str()],
                ChangeDetail::Single { .. } => Vec::new(),
                ChangeDetail::Batch { updates } => updates
                    .iter()
                    .filter(|(_, v)| v.is_on())
                    .map(|(k, _)| k.as_str())
                    .collect(),
            };
            if turned_on.is_empty() {
                return Ok(());
            }

            let off = policy.resolve(&turned_on, &settings.snapshot());
            if off.is_empty() {
                return Ok(());
            }
            let Some(manager) = manager.upgrade() else {
                return Ok(());
            };
            debug!(keys = ?off.keys().collect::<Vec<_>>(), "Switching off conflicting settings");
            manager.update_settings(off);
            Ok(())
        });

        Self { subscription }
    }

    /// Stop enforcing; `false` if already detached
    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryBackend};

    fn setup(
        policy: ExclusivityPolicy,
    ) -> (Rc<EventBus<SettingsEvent>>, Rc<SettingsManager>, ExclusiveSettings) {
        let store = Rc::new(KeyValueStore::with_default_prefix(MemoryBackend::new()));
        let bus = Rc::new(EventBus::new());
        let manager = Rc::new(SettingsManager::load_new(store, Rc::clone(&bus)));
        let feature = ExclusiveSettings::attach(&manager, &bus, policy);
        (bus, manager, feature)
    }

    fn on(map: &SettingsMap, key: &str) -> bool {
        map.get(key).is_some_and(SettingValue::is_on)
    }

    #[test]
    fn test_resolve_single_group() {
        let policy = ExclusivityPolicy::default();
        let mut current = SettingsMap::new();
        current.insert("darkMode".to_string(), SettingValue::Bool(true));
        current.insert("lightMode".to_string(), SettingValue::Bool(true));

        let off = policy.resolve(&["darkMode"], &current);
        assert_eq!(off.len(), 1);
        assert_eq!(off.get("lightMode"), Some(&SettingValue::Bool(false)));

        // nothing in a group turned on -> nothing to do
        assert!(policy.resolve(&["contrast"], &current).is_empty());
    }

    #[test]
    fn test_resolve_ignores_key_switched_off_again() {
        let policy = ExclusivityPolicy::default();
        let mut current = SettingsMap::new();
        current.insert("darkMode".to_string(), SettingValue::Bool(false));
        current.insert("lightMode".to_string(), SettingValue::Bool(true));
        assert!(policy.resolve(&["darkMode"], &current).is_empty());
    }

    #[test]
    fn test_resolve_prefers_earlier_group_member() {
        let policy = ExclusivityPolicy::default();
        let mut current = SettingsMap::new();
        current.insert("darkMode".to_string(), SettingValue::Bool(true));
        current.insert("lightMode".to_string(), SettingValue::Bool(true));

        let off = policy.resolve(&["lightMode", "darkMode"], &current);
        assert_eq!(off.keys().collect::<Vec<_>>(), vec!["lightMode"]);
    }

    #[test]
    fn test_single_member_groups_are_ignored() {
        let policy = ExclusivityPolicy::empty().with_group(["alone"]);
        assert!(policy.groups().is_empty());
    }

    #[test]
    fn test_turning_on_dark_mode_turns_off_light_mode() {
        let (_bus, manager, _feature) = setup(ExclusivityPolicy::default());
        manager.update_setting("lightMode", true);
        manager.update_setting("darkMode", true);

        let settings = manager.get_all();
        assert!(on(&settings, "darkMode"));
        assert!(!on(&settings, "lightMode"));

        manager.update_setting("lightMode", true);
        let settings = manager.get_all();
        assert!(!on(&settings, "darkMode"));
        assert!(on(&settings, "lightMode"));
    }

    #[test]
    fn test_batch_update_keeps_one_member() {
        let (_bus, manager, _feature) = setup(ExclusivityPolicy::default());
        let mut updates = SettingsMap::new();
        updates.insert("darkMode".to_string(), SettingValue::Bool(true));
        updates.insert("lightMode".to_string(), SettingValue::Bool(true));
        manager.update_settings(updates);

        let settings = manager.get_all();
        assert!(on(&settings, "darkMode"));
        assert!(!on(&settings, "lightMode"));
    }

    #[test]
    fn test_custom_group() {
        let policy = ExclusivityPolicy::empty().with_group(["contrast", "grayscale"]);
        let (_bus, manager, _feature) = setup(policy);
        manager.update_setting("contrast", true);
        manager.update_setting("grayscale", true);
        assert!(!on(&manager.get_all(), "contrast"));

        // the default pair is not part of this policy
        manager.update_setting("lightMode", true);
        manager.update_setting("darkMode", true);
        assert!(on(&manager.get_all(), "lightMode"));
    }

    #[test]
    fn test_observers_after_the_policy_see_resolved_state() {
        let (bus, manager, _feature) = setup(ExclusivityPolicy::default());
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(channels::CHANGED, move |e| {
            if let Some(settings) = e.payload.settings() {
                sink.borrow_mut().push(settings.snapshot());
            }
            Ok(())
        });

        manager.update_setting("lightMode", true);
        manager.update_setting("darkMode", true);

        let seen = seen.borrow();
        // lightMode on, then the nested switch-off, then the outer darkMode change
        assert_eq!(seen.len(), 3);
        for settings in &seen[1..] {
            assert!(on(settings, "darkMode"));
            assert!(!on(settings, "lightMode"));
        }
    }

    #[test]
    fn test_detach_stops_enforcement() {
        let (bus, manager, feature) = setup(ExclusivityPolicy::default());
        assert_eq!(bus.subscriber_count(channels::CHANGED), 1);
        assert!(feature.detach());
        assert!(!feature.detach());
        assert_eq!(bus.subscriber_count(channels::CHANGED), 0);

        manager.update_setting("lightMode", true);
        manager.update_setting("darkMode", true);
        assert!(on(&manager.get_all(), "lightMode"));
    }
}
