//! Settings/profile manager
//!
//! Single source of truth for the widget's accessibility settings. Owns the
//! current settings mapping and the named profiles, persists both through a
//! [`KeyValueStore`] and announces every mutation on the [`EventBus`].
//!
//! No method fails loudly. Storage trouble is logged and surfaces only as a
//! `false` persistence flag; invalid profile names are logged and rejected
//! with `false`. The mapping always holds every default key.
//!
//! All methods take `&self` and never hold the internal borrow while
//! publishing, so a handler may call straight back into the manager (a
//! feature module reacting to `settings:changed` with another update).
//! Events carry the live mapping as a [`SettingsView`], so handlers later in
//! the same dispatch see the effect of such a nested update.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::event::{ChangeDetail, SettingsEvent, SettingsView};
use super::profile::{backfill, builtin_profiles, default_settings, is_reserved, reconcile};
use super::schema::{SchemaError, SettingId};
use super::value::{ProfileMap, SettingValue, SettingsMap};
use crate::bus::EventBus;
use crate::constants::profiles::DEFAULT;
use crate::constants::storage::{PROFILES_KEY, SETTINGS_KEY};
use crate::storage::KeyValueStore;

/// Format version written by [`SettingsManager::export_profiles`]
const BUNDLE_VERSION: u32 = 1;

struct State {
    profiles: ProfileMap,
    loaded: bool,
}

/// Portable backup of custom profiles
#[derive(Debug, Serialize, Deserialize)]
struct ProfileBundle {
    version: u32,
    profiles: ProfileMap,
}

pub struct SettingsManager {
    store: Rc<KeyValueStore>,
    bus: Rc<EventBus<SettingsEvent>>,
    settings: SettingsView,
    state: RefCell<State>,
}

impl SettingsManager {
    /// Manager holding built-in defaults; call [`Self::load`] to read storage
    pub fn new(store: Rc<KeyValueStore>, bus: Rc<EventBus<SettingsEvent>>) -> Self {
        Self {
            store,
            bus,
            settings: SettingsView::from(default_settings()),
            state: RefCell::new(State {
                profiles: builtin_profiles(),
                loaded: false,
            }),
        }
    }

    /// Construct and load in one step
    pub fn load_new(store: Rc<KeyValueStore>, bus: Rc<EventBus<SettingsEvent>>) -> Self {
        let manager = Self::new(store, bus);
        manager.load();
        manager
    }

    /// Live handle on the current settings
    pub fn view(&self) -> SettingsView {
        self.settings.clone()
    }

    fn publish(&self, event: SettingsEvent) {
        let delivered = self.bus.publish(event.channel(), &event);
        debug!(channel = event.channel(), delivered, "Published settings event");
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    /// (Re)read settings and profiles from storage
    ///
    /// Missing or unreadable data falls back to the built-ins. Calling this
    /// again discards in-memory changes that were not persisted.
    pub fn load(&self) {
        let settings = match self.store.get_json::<SettingsMap>(SETTINGS_KEY) {
            Some(mut stored) => {
                let added = backfill(&mut stored);
                info!(keys = stored.len(), backfilled = added, "Loaded settings from storage");
                stored
            }
            None => {
                info!("No stored settings, using defaults");
                default_settings()
            }
        };

        let profiles = match self.store.get_json::<ProfileMap>(PROFILES_KEY) {
            Some(mut stored) => {
                reconcile(&mut stored);
                info!(count = stored.len(), "Loaded profiles from storage");
                stored
            }
            None => {
                info!("No stored profiles, using built-in presets");
                builtin_profiles()
            }
        };

        self.settings.replace(settings);
        {
            let mut state = self.state.borrow_mut();
            state.profiles = profiles;
            state.loaded = true;
        }
        self.publish(SettingsEvent::Loaded {
            settings: self.view(),
        });
    }

    /// Persist the current settings; returns whether the write landed
    pub fn save(&self) -> bool {
        let persisted = self.store.set_json(SETTINGS_KEY, &self.settings);
        if !persisted {
            debug!("Settings kept in memory only");
        }
        self.publish(SettingsEvent::Saved {
            settings: self.view(),
            persisted,
        });
        persisted
    }

    fn persist_profiles(&self) -> bool {
        let profiles = self.get_profiles();
        let persisted = self.store.set_json(PROFILES_KEY, &profiles);
        if !persisted {
            debug!("Profiles kept in memory only");
        }
        persisted
    }

    /// Set one setting; any key is accepted. Returns whether it was persisted.
    pub fn update_setting(&self, key: impl Into<String>, value: impl Into<SettingValue>) -> bool {
        let key = key.into();
        let value = value.into();
        debug!(key = %key, value = %value, "Updating setting");

        self.settings.update(|s| s.insert(key.clone(), value));
        let persisted = self.save();
        self.publish(SettingsEvent::Changed {
            settings: self.view(),
            detail: ChangeDetail::Single { key, value },
        });
        persisted
    }

    /// Merge `updates` into the settings. Returns whether it was persisted.
    pub fn update_settings(&self, updates: SettingsMap) -> bool {
        debug!(count = updates.len(), "Updating settings");

        self.settings
            .update(|s| s.extend(updates.iter().map(|(k, v)| (k.clone(), *v))));
        let persisted = self.save();
        self.publish(SettingsEvent::Changed {
            settings: self.view(),
            detail: ChangeDetail::Batch { updates },
        });
        persisted
    }

    pub fn get_setting(&self, key: &str) -> Option<SettingValue> {
        self.settings.get(key)
    }

    /// Copy of the current settings
    pub fn get_all(&self) -> SettingsMap {
        self.settings.snapshot()
    }

    /// Validate against the known schema, then [`Self::update_setting`]
    pub fn set(&self, id: SettingId, value: impl Into<SettingValue>) -> Result<bool, SchemaError> {
        let value = id.validate(value.into())?;
        Ok(self.update_setting(id.key(), value))
    }

    /// Current value of a known setting
    pub fn get(&self, id: SettingId) -> SettingValue {
        self.get_setting(id.key()).unwrap_or_else(|| id.default_value())
    }

    /// Replace every setting with the built-in defaults
    pub fn reset_all(&self) -> bool {
        info!("Resetting all settings to defaults");
        self.settings.replace(default_settings());
        let persisted = self.save();
        self.publish(SettingsEvent::Reset {
            settings: self.view(),
        });
        persisted
    }

    /// Apply a stored profile; `false` if no profile has that name
    pub fn load_profile(&self, name: &str) -> bool {
        let Some(mut next) = self.state.borrow().profiles.get(name).cloned() else {
            warn!(profile = %name, "Profile not found, settings unchanged");
            return false;
        };
        backfill(&mut next);
        self.settings.replace(next);
        info!(profile = %name, "Loaded profile");
        self.save();
        self.publish(SettingsEvent::ProfileLoaded {
            name: name.to_string(),
            settings: self.view(),
        });
        true
    }

    /// Store the current settings under `name`; `default` is refused
    pub fn save_profile(&self, name: &str) -> bool {
        if name == DEFAULT {
            warn!(profile = %name, "Refusing to overwrite the default profile");
            return false;
        }
        let settings = self.get_all();
        self.state
            .borrow_mut()
            .profiles
            .insert(name.to_string(), settings.clone());
        info!(profile = %name, "Saved profile");
        self.persist_profiles();
        self.publish(SettingsEvent::ProfileSaved {
            name: name.to_string(),
            settings: settings.into(),
        });
        true
    }

    /// Remove a custom profile; built-in names and unknown names give `false`
    pub fn delete_profile(&self, name: &str) -> bool {
        if is_reserved(name) {
            warn!(profile = %name, "Refusing to delete a built-in profile");
            return false;
        }
        let removed = self.state.borrow_mut().profiles.remove(name).is_some();
        if !removed {
            warn!(profile = %name, "Profile not found, nothing deleted");
            return false;
        }
        info!(profile = %name, "Deleted profile");
        self.persist_profiles();
        self.publish(SettingsEvent::ProfileDeleted {
            name: name.to_string(),
        });
        true
    }

    /// Copy of every profile, built-in and custom
    pub fn get_profiles(&self) -> ProfileMap {
        self.state.borrow().profiles.clone()
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.state.borrow().profiles.keys().cloned().collect()
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.state.borrow().profiles.contains_key(name)
    }

    /// Serialize custom profiles, and presets the user re-saved, as a JSON backup
    ///
    /// Presets still equal to their built-in values are left out.
    pub fn export_profiles(&self) -> Result<String> {
        let builtin = builtin_profiles();
        let profiles: ProfileMap = self
            .state
            .borrow()
            .profiles
            .iter()
            .filter(|(name, settings)| builtin.get(*name) != Some(*settings))
            .map(|(name, settings)| (name.clone(), settings.clone()))
            .collect();
        let bundle = ProfileBundle {
            version: BUNDLE_VERSION,
            profiles,
        };
        serde_json::to_string_pretty(&bundle).context("Failed to serialize profile bundle")
    }

    /// Merge custom profiles from a backup made by [`Self::export_profiles`]
    ///
    /// Follows the [`Self::save_profile`] rule: `default` in the bundle is
    /// skipped, other presets are overwritten. Each imported profile is
    /// announced as `settings:profile:saved`. Returns how many were imported.
    pub fn import_profiles(&self, json: &str) -> Result<usize> {
        let bundle: ProfileBundle =
            serde_json::from_str(json).context("Failed to parse profile bundle")?;
        if bundle.version > BUNDLE_VERSION {
            warn!(
                version = bundle.version,
                supported = BUNDLE_VERSION,
                "Profile bundle is newer than this version, importing anyway"
            );
        }

        let mut imported = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            for (name, mut settings) in bundle.profiles {
                if name == DEFAULT {
                    warn!(profile = %name, "Skipping default profile in bundle");
                    continue;
                }
                backfill(&mut settings);
                state.profiles.insert(name.clone(), settings.clone());
                imported.push((name, settings));
            }
        }

        if imported.is_empty() {
            return Ok(0);
        }
        self.persist_profiles();
        let count = imported.len();
        for (name, settings) in imported {
            self.publish(SettingsEvent::ProfileSaved {
                name,
                settings: settings.into(),
            });
        }
        info!(count, "Imported profiles");
        Ok(count)
    }
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SettingsManager")
            .field("loaded", &state.loaded)
            .field("settings", &self.settings)
            .field("profiles", &state.profiles.keys().collect::<Vec<_>>())
            .finish()
    }
}
