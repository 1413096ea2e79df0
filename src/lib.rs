//! Settings core for the Spicy accessibility widget
//!
//! Holds the user's accessibility settings and named profiles, persists them
//! best-effort through a namespaced key-value store, and tells every
//! interested feature module about changes through a synchronous
//! publish/subscribe bus.

#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod constants;
pub mod context;
pub mod features;
pub mod settings;
pub mod storage;

pub use bus::{Event, EventBus, Subscription, SubscriptionId};
pub use config::WidgetConfig;
pub use context::A11yContext;
pub use features::{ExclusiveSettings, ExclusivityPolicy};
pub use settings::{
    ChangeDetail, ProfileMap, SchemaError, SettingId, SettingValue, SettingsEvent,
    SettingsManager, SettingsMap, SettingsView,
};
pub use storage::{FileBackend, KeyValueStore, MemoryBackend, StorageBackend, UnavailableBackend};
