use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::value::{SettingValue, SettingsMap};
use crate::constants::channels;

/// Shared read handle on a settings mapping
///
/// The manager hands out its own live mapping in every event, so a handler
/// that runs after another handler changed the settings reads the current
/// state rather than the one at publish time. A view built from a plain map
/// (`From<SettingsMap>`) is detached and never changes.
#[derive(Clone, Default)]
pub struct SettingsView(Rc<RefCell<SettingsMap>>);

impl SettingsView {
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.0.borrow().get(key).copied()
    }

    pub fn is_on(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.is_on())
    }

    /// Owned copy of the mapping as it is now
    pub fn snapshot(&self) -> SettingsMap {
        self.0.borrow().clone()
    }

    pub(crate) fn replace(&self, settings: SettingsMap) {
        *self.0.borrow_mut() = settings;
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SettingsMap) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl From<SettingsMap> for SettingsView {
    fn from(settings: SettingsMap) -> Self {
        Self(Rc::new(RefCell::new(settings)))
    }
}

impl PartialEq for SettingsView {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0.borrow() == *other.0.borrow()
    }
}

impl PartialEq<SettingsMap> for SettingsView {
    fn eq(&self, other: &SettingsMap) -> bool {
        *self.0.borrow() == *other
    }
}

impl fmt::Debug for SettingsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SettingsView").field(&*self.0.borrow()).finish()
    }
}

impl Serialize for SettingsView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.borrow().serialize(serializer)
    }
}

/// What changed in a `settings:changed` notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangeDetail {
    Single { key: String, value: SettingValue },
    Batch { updates: SettingsMap },
}

impl ChangeDetail {
    /// Keys touched by this change
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ChangeDetail::Single { key, .. } => vec![key.as_str()],
            ChangeDetail::Batch { updates } => updates.keys().map(String::as_str).collect(),
        }
    }
}

/// Payload published by the settings manager; each variant has its own channel
///
/// `settings` is the manager's live mapping, except for `ProfileSaved` where
/// it is the stored profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SettingsEvent {
    Loaded {
        settings: SettingsView,
    },
    Saved {
        settings: SettingsView,
        persisted: bool,
    },
    Changed {
        settings: SettingsView,
        detail: ChangeDetail,
    },
    Reset {
        settings: SettingsView,
    },
    ProfileLoaded {
        name: String,
        settings: SettingsView,
    },
    ProfileSaved {
        name: String,
        settings: SettingsView,
    },
    ProfileDeleted {
        name: String,
    },
}

impl SettingsEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            SettingsEvent::Loaded { .. } => channels::LOADED,
            SettingsEvent::Saved { .. } => channels::SAVED,
            SettingsEvent::Changed { .. } => channels::CHANGED,
            SettingsEvent::Reset { .. } => channels::RESET,
            SettingsEvent::ProfileLoaded { .. } => channels::PROFILE_LOADED,
            SettingsEvent::ProfileSaved { .. } => channels::PROFILE_SAVED,
            SettingsEvent::ProfileDeleted { .. } => channels::PROFILE_DELETED,
        }
    }

    /// Settings carried by the event, if any
    pub fn settings(&self) -> Option<&SettingsView> {
        match self {
            SettingsEvent::Loaded { settings }
            | SettingsEvent::Saved { settings, .. }
            | SettingsEvent::Changed { settings, .. }
            | SettingsEvent::Reset { settings }
            | SettingsEvent::ProfileLoaded { settings, .. }
            | SettingsEvent::ProfileSaved { settings, .. } => Some(settings),
            SettingsEvent::ProfileDeleted { .. } => None,
        }
    }
}
