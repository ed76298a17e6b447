//! Castmate Linux Platform Layer
//!
//! - PulseAudio / PipeWire (pipewire-pulse) default device lookup via `pactl`
//! - D-Bus proxy for the GNOME Shell screencast service

pub mod pactl;
pub mod screencast;

pub use pactl::PactlDeviceProvider;
pub use screencast::{connect_screencast, ShellScreencastProxy};
