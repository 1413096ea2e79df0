//! Explicit widget context
//!
//! Owns the store, bus and settings manager for one widget instance and the
//! subscriptions made on its behalf. Hosts create one, hand out references,
//! and call [`A11yContext::dispose`] on teardown.

use anyhow::Result;
use std::rc::Rc;
use tracing::{debug, info};

use crate::bus::{Event, EventBus, Subscription, SubscriptionId};
use crate::config::WidgetConfig;
use crate::features::{ExclusiveSettings, ExclusivityPolicy};
use crate::settings::{SettingsEvent, SettingsManager};
use crate::storage::{FileBackend, KeyValueStore, StorageBackend};

pub struct A11yContext {
    store: Rc<KeyValueStore>,
    bus: Rc<EventBus<SettingsEvent>>,
    manager: Rc<SettingsManager>,
    exclusive: Option<ExclusiveSettings>,
    subscriptions: Vec<Subscription<SettingsEvent>>,
    disposed: bool,
}

impl A11yContext {
    /// Context backed by the storage file named in `config`
    pub fn new(config: &WidgetConfig) -> Self {
        let path = config.resolved_storage_path();
        info!(path = %path.display(), "Using storage file");
        Self::with_backend(config, FileBackend::new(path))
    }

    /// Context over any backend; settings are loaded before this returns
    pub fn with_backend(config: &WidgetConfig, backend: impl StorageBackend + 'static) -> Self {
        let store = Rc::new(KeyValueStore::new(backend, config.storage_prefix.clone()));
        store.set_persist(config.persist);

        let bus = Rc::new(EventBus::new());
        let manager = Rc::new(SettingsManager::new(Rc::clone(&store), Rc::clone(&bus)));
        let exclusive = ExclusiveSettings::attach(&manager, &bus, ExclusivityPolicy::default());
        manager.load();

        Self {
            store,
            bus,
            manager,
            exclusive: Some(exclusive),
            subscriptions: Vec::new(),
            disposed: false,
        }
    }

    pub fn manager(&self) -> &Rc<SettingsManager> {
        &self.manager
    }

    pub fn bus(&self) -> &Rc<EventBus<SettingsEvent>> {
        &self.bus
    }

    pub fn store(&self) -> &Rc<KeyValueStore> {
        &self.store
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Subscribe on behalf of the host; removed again by [`Self::dispose`]
    pub fn subscribe<F>(&mut self, channel: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event<'_, SettingsEvent>) -> Result<()> + 'static,
    {
        let subscription = self.bus.subscribe(channel, handler);
        let id = subscription.id();
        self.subscriptions.push(subscription);
        id
    }

    /// Drop every subscription this context made and clear the bus
    ///
    /// Settings stay readable through [`Self::manager`]; they just stop
    /// reaching any observer. Calling it twice is harmless.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(exclusive) = self.exclusive.take() {
            exclusive.detach();
        }
        let removed = self
            .subscriptions
            .drain(..)
            .filter(|s| s.unsubscribe())
            .count();
        self.bus.clear(None);
        self.disposed = true;
        debug!(removed, "Disposed accessibility context");
    }
}

impl Drop for A11yContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::channels;
    use crate::settings::SettingValue;
    use crate::storage::{MemoryBackend, UnavailableBackend};
    use std::cell::Cell;

    #[test]
    fn test_context_loads_and_wires_exclusivity() {
        let ctx = A11yContext::with_backend(&WidgetConfig::default(), MemoryBackend::new());
        assert!(ctx.manager().is_loaded());
        assert!(ctx.store().is_available());

        ctx.manager().update_setting("lightMode", true);
        ctx.manager().update_setting("darkMode", true);
        assert_eq!(ctx.manager().get_setting("lightMode"), Some(SettingValue::Bool(false)));
    }

    #[test]
    fn test_host_observer_ends_on_current_settings() {
        let mut ctx = A11yContext::with_backend(&WidgetConfig::default(), MemoryBackend::new());
        let last = Rc::new(std::cell::RefCell::new(None));
        let sink = Rc::clone(&last);
        ctx.subscribe(channels::CHANGED, move |e| {
            *sink.borrow_mut() = e.payload.settings().map(|s| s.snapshot());
            Ok(())
        });

        ctx.manager().update_setting("lightMode", true);
        ctx.manager().update_setting("darkMode", true);

        let observed = last.borrow().clone();
        assert_eq!(observed, Some(ctx.manager().get_all()));
        assert_eq!(
            observed.and_then(|s| s.get("lightMode").copied()),
            Some(SettingValue::Bool(false))
        );
    }

    #[test]
    fn test_context_honours_prefix_and_persist() {
        let backend = MemoryBackend::new();
        let config = WidgetConfig {
            storage_prefix: "acme_".to_string(),
            persist: false,
            ..WidgetConfig::default()
        };
        let ctx = A11yContext::with_backend(&config, backend.clone());
        assert_eq!(ctx.store().prefix(), "acme_");
        assert!(!ctx.manager().update_setting("fontSize", 150));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_dispose_unsubscribes_everything() {
        let mut ctx = A11yContext::with_backend(&WidgetConfig::default(), MemoryBackend::new());
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        ctx.subscribe(channels::CHANGED, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        ctx.manager().update_setting("tooltips", true);
        assert_eq!(seen.get(), 1);

        ctx.dispose();
        assert!(ctx.is_disposed());
        assert_eq!(ctx.bus().subscriber_count(channels::CHANGED), 0);

        // state still works, nobody hears about it
        ctx.manager().update_setting("tooltips", false);
        assert_eq!(seen.get(), 1);
        assert_eq!(ctx.manager().get_setting("tooltips"), Some(SettingValue::Bool(false)));

        ctx.dispose();
    }

    #[test]
    fn test_context_without_storage() {
        let ctx = A11yContext::with_backend(&WidgetConfig::default(), UnavailableBackend);
        assert!(!ctx.store().is_available());
        assert_eq!(ctx.manager().get_profiles().len(), 7);
        assert!(!ctx.manager().save_profile("default"));
        assert!(ctx.manager().save_profile("mine"));
        assert!(ctx.manager().load_profile("mine"));
    }
}
