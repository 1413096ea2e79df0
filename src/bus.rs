//! Synchronous publish/subscribe bus
//!
//! Named channels plus a wildcard channel (`*`) that sees every publish.
//! Everything runs on the caller's thread: `publish` invokes each handler in
//! turn and returns once all of them finished. Handlers may call back into
//! the bus (subscribe, unsubscribe, publish) while being dispatched.

use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use tracing::{debug, error};

use crate::constants::channels::WILDCARD;

/// What a handler receives: the channel it was published on and the payload
#[derive(Debug)]
pub struct Event<'a, P> {
    pub channel: &'a str,
    pub payload: &'a P,
}

/// Handlers report failure by returning `Err`; a panic is treated the same way
pub type Handler<P> = Rc<dyn Fn(&Event<'_, P>) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry<P> {
    id: SubscriptionId,
    handler: Handler<P>,
}

struct Registry<P> {
    next_id: u64,
    channels: HashMap<String, Vec<Entry<P>>>,
}

impl<P> Registry<P> {
    fn remove(&mut self, channel: &str, id: SubscriptionId) -> bool {
        let Some(entries) = self.channels.get_mut(channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }
}

pub struct EventBus<P> {
    registry: Rc<RefCell<Registry<P>>>,
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> EventBus<P> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 1,
                channels: HashMap::new(),
            })),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        let mut registry = self.registry.borrow_mut();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        id
    }

    fn register(&self, channel: &str, id: SubscriptionId, handler: Handler<P>) -> Subscription<P> {
        self.registry
            .borrow_mut()
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(Entry { id, handler });
        debug!(channel = %channel, subscription = id.0, "Subscribed");
        Subscription {
            registry: Rc::downgrade(&self.registry),
            channel: channel.to_string(),
            id,
        }
    }

    /// Register `handler` on `channel`; handlers run in registration order
    pub fn subscribe<F>(&self, channel: &str, handler: F) -> Subscription<P>
    where
        F: Fn(&Event<'_, P>) -> Result<()> + 'static,
    {
        let id = self.next_id();
        self.register(channel, id, Rc::new(handler))
    }

    /// Register a handler that removes itself before its first invocation
    ///
    /// A publish made from inside the handler will not reach it again.
    pub fn subscribe_once<F>(&self, channel: &str, handler: F) -> Subscription<P>
    where
        F: Fn(&Event<'_, P>) -> Result<()> + 'static,
    {
        let id = self.next_id();
        let fired = Cell::new(false);
        let registry = Rc::downgrade(&self.registry);
        let owned_channel = channel.to_string();
        let wrapper = move |event: &Event<'_, P>| {
            if fired.replace(true) {
                return Ok(());
            }
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove(&owned_channel, id);
            }
            handler(event)
        };
        self.register(channel, id, Rc::new(wrapper))
    }

    /// Remove one registration; `false` if it was not (or no longer) registered
    pub fn unsubscribe(&self, channel: &str, id: SubscriptionId) -> bool {
        let removed = self.registry.borrow_mut().remove(channel, id);
        if removed {
            debug!(channel = %channel, subscription = id.0, "Unsubscribed");
        }
        removed
    }

    /// Deliver `payload` to `channel`'s handlers, then to wildcard handlers
    ///
    /// The handler list is captured before the first handler runs, so
    /// registrations made during dispatch take effect from the next publish.
    /// Failures are logged and never reach the publisher. Returns how many
    /// handlers completed successfully.
    pub fn publish(&self, channel: &str, payload: &P) -> usize {
        let handlers: Vec<(SubscriptionId, Handler<P>)> = {
            let registry = self.registry.borrow();
            let direct = registry.channels.get(channel).into_iter().flatten();
            let wildcard = registry
                .channels
                .get(WILDCARD)
                .filter(|_| channel != WILDCARD)
                .into_iter()
                .flatten();
            direct
                .chain(wildcard)
                .map(|e| (e.id, Rc::clone(&e.handler)))
                .collect()
        };

        let event = Event { channel, payload };
        let mut completed = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => {
                    error!(
                        channel = %channel,
                        subscription = id.0,
                        error = ?e,
                        "Event handler failed"
                    );
                }
                Err(cause) => {
                    let message = cause
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| cause.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(
                        channel = %channel,
                        subscription = id.0,
                        panic = %message,
                        "Event handler panicked"
                    );
                }
            }
        }
        completed
    }

    /// Drop every registration on `channel`, or on every channel if `None`
    pub fn clear(&self, channel: Option<&str>) {
        let mut registry = self.registry.borrow_mut();
        match channel {
            Some(channel) => {
                registry.channels.remove(channel);
            }
            None => registry.channels.clear(),
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry
            .borrow()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }
}

/// Capability to remove exactly one registration
///
/// Dropping it leaves the handler registered; call [`Subscription::unsubscribe`].
pub struct Subscription<P> {
    registry: Weak<RefCell<Registry<P>>>,
    channel: String,
    id: SubscriptionId,
}

impl<P> Subscription<P> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `false` if already removed or the bus is gone
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(&self.channel, self.id),
            None => false,
        }
    }
}

impl<P> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}
