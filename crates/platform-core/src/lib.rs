//! Castmate platform core contracts.
//!
//! This crate contains the audio device data structures and the device
//! provider seam used by the capture engine without coupling it to a
//! concrete sound server.

use serde::{Deserialize, Serialize};

pub mod memory;
pub mod observer;

pub use memory::StaticDeviceProvider;
pub use observer::{DeviceListener, DeviceSubscription, ListenerRegistry};

/// A default playback (sink) or capture (source) device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioDevice {
    /// Sound server device name, e.g. `alsa_output.pci-0000_00_1f.3.analog-stereo`.
    pub name: String,
    /// Human readable description.
    pub description: String,
    /// Human readable name of the active port, if the device has ports.
    pub port: Option<String>,
    /// Number of channels in the device's channel map.
    pub channels: u32,
}

impl AudioDevice {
    pub fn new(name: impl Into<String>, channels: u32) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            port: None,
            channels,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Name of the virtual source that taps this sink's output.
    pub fn monitor_name(&self) -> String {
        format!("{}.monitor", self.name)
    }

    /// `"<port>: <description>"`, or just the description without a port.
    pub fn label(&self) -> String {
        match &self.port {
            Some(port) => format!("{port}: {}", self.description),
            None => self.description.clone(),
        }
    }
}

/// Which default device changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    DefaultSinkChanged(Option<AudioDevice>),
    DefaultSourceChanged(Option<AudioDevice>),
}

/// Source of live default-device information.
///
/// Lookups return `None` when no default device exists; that is an expected
/// state, not an error.
pub trait AudioDeviceProvider: Send + Sync {
    /// Current default playback device.
    fn default_sink(&self) -> Option<AudioDevice>;

    /// Current default capture device.
    fn default_source(&self) -> Option<AudioDevice>;

    /// Register for default-device changes. The listener stays registered
    /// until the returned handle is dropped.
    fn subscribe(&self, listener: DeviceListener) -> DeviceSubscription;
}
