//! In-memory device provider.

use std::sync::{Mutex, PoisonError};

use crate::observer::{DeviceListener, DeviceSubscription, ListenerRegistry};
use crate::{AudioDevice, AudioDeviceProvider, DeviceEvent};

/// Device provider fed by the host.
///
/// Useful when the embedding shell already tracks default devices itself,
/// and in tests.
#[derive(Debug, Default)]
pub struct StaticDeviceProvider {
    sink: Mutex<Option<AudioDevice>>,
    source: Mutex<Option<AudioDevice>>,
    listeners: ListenerRegistry,
}

impl StaticDeviceProvider {
    pub fn new(sink: Option<AudioDevice>, source: Option<AudioDevice>) -> Self {
        Self {
            sink: Mutex::new(sink),
            source: Mutex::new(source),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Replace the default sink, notifying listeners if it changed.
    pub fn set_default_sink(&self, sink: Option<AudioDevice>) {
        if replace_if_changed(&self.sink, sink.clone()) {
            self.listeners.notify(&DeviceEvent::DefaultSinkChanged(sink));
        }
    }

    /// Replace the default source, notifying listeners if it changed.
    pub fn set_default_source(&self, source: Option<AudioDevice>) {
        if replace_if_changed(&self.source, source.clone()) {
            self.listeners
                .notify(&DeviceEvent::DefaultSourceChanged(source));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

fn replace_if_changed(slot: &Mutex<Option<AudioDevice>>, next: Option<AudioDevice>) -> bool {
    let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if *current == next {
        return false;
    }
    *current = next;
    true
}

impl AudioDeviceProvider for StaticDeviceProvider {
    fn default_sink(&self) -> Option<AudioDevice> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn default_source(&self) -> Option<AudioDevice> {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self, listener: DeviceListener) -> DeviceSubscription {
        self.listeners.subscribe(listener)
    }
}
