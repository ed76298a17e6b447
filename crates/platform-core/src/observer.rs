//! Listener registration with owned unsubscribe handles.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::DeviceEvent;

/// Callback invoked on every default-device change.
pub type DeviceListener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, DeviceListener>,
}

/// Shared list of device listeners.
///
/// Providers embed one and hand out [`DeviceSubscription`]s from
/// [`ListenerRegistry::subscribe`].
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: DeviceListener) -> DeviceSubscription {
        let mut listeners = lock(&self.inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, listener);
        tracing::trace!(id, "Device listener registered");

        DeviceSubscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every registered listener.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// drop subscriptions themselves.
    pub fn notify(&self, event: &DeviceEvent) {
        let snapshot: Vec<DeviceListener> = lock(&self.inner).entries.values().cloned().collect();
        tracing::debug!(listeners = snapshot.len(), ?event, "Dispatching device event");
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Registration handle. Dropping it unregisters the listener.
#[must_use = "dropping the subscription unregisters the listener immediately"]
#[derive(Debug)]
pub struct DeviceSubscription {
    id: u64,
    registry: Weak<Mutex<Listeners>>,
}

impl DeviceSubscription {
    /// A handle that is not attached to any registry.
    pub fn detached() -> Self {
        Self {
            id: 0,
            registry: Weak::new(),
        }
    }

    /// Unregister now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for DeviceSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.remove(&self.id);
            tracing::trace!(id = self.id, "Device listener unregistered");
        }
    }
}
