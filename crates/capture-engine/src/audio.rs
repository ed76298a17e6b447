//! Audio source resolution.
//!
//! Turns the user's audio intent and the current default devices into the
//! audio branch of a pipeline description. Sources are resolved fresh for
//! every attempt; nothing here is cached.

use std::fmt;

use castmate_platform_core::{AudioDevice, AudioDeviceProvider};
use serde::{Deserialize, Serialize};

/// Name of the mixer element when both sources are recorded.
pub const MIXER_NAME: &str = "am";

/// Mixer buffering latency in nanoseconds (100 ms). Absorbs clock drift
/// between the desktop monitor and the microphone.
pub const MIXER_LATENCY_NS: u64 = 100_000_000;

/// Which audio sources the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureIntent {
    pub desktop_audio: bool,
    pub mic_audio: bool,
}

impl CaptureIntent {
    pub fn new(desktop_audio: bool, mic_audio: bool) -> Self {
        Self {
            desktop_audio,
            mic_audio,
        }
    }

    pub fn wants_audio(&self) -> bool {
        self.desktop_audio || self.mic_audio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSourceKind {
    Desktop,
    Mic,
}

impl fmt::Display for AudioSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => f.write_str("Desktop Audio"),
            Self::Mic => f.write_str("Mic Audio"),
        }
    }
}

/// One audio input feeding the recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    /// Device passed to `pulsesrc`. For desktop audio this is the sink's monitor.
    pub device_name: String,
    pub channel_count: u32,
    pub kind: AudioSourceKind,
}

impl AudioSource {
    /// Desktop audio taps the default sink through its monitor source.
    pub fn desktop(sink: &AudioDevice) -> Self {
        Self {
            device_name: sink.monitor_name(),
            channel_count: sink.channels.max(1),
            kind: AudioSourceKind::Desktop,
        }
    }

    pub fn mic(source: &AudioDevice) -> Self {
        Self {
            device_name: source.name.clone(),
            channel_count: source.channels.max(1),
            kind: AudioSourceKind::Mic,
        }
    }

    /// `pulsesrc` plus an explicit channel caps filter, so downstream
    /// elements don't fall back to stereo on mono or surround devices.
    pub fn describe(&self) -> String {
        format!(
            "pulsesrc device={} provide-clock=false ! {}",
            self.device_name,
            channels_caps(self.channel_count)
        )
    }
}

fn channels_caps(channels: u32) -> String {
    format!("capsfilter caps=audio/x-raw,channels={channels}")
}

/// Audio branch of a pipeline, ready to be followed by an audio encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFragment {
    sources: Vec<AudioSource>,
    description: String,
}

impl AudioFragment {
    fn single(source: AudioSource) -> Self {
        Self {
            description: source.describe(),
            sources: vec![source],
        }
    }

    /// Merge desktop and mic audio through a mixer.
    ///
    /// The mixer output is re-capped to the desktop channel count. The mic's
    /// own channel count is dropped at this point and the mixer up/down-mixes
    /// it implicitly.
    fn mixed(desktop: AudioSource, mic: AudioSource) -> Self {
        let segments = [
            format!(
                "{} ! audiomixer name={MIXER_NAME} latency={MIXER_LATENCY_NS}",
                desktop.describe()
            ),
            format!("{} ! {MIXER_NAME}.", mic.describe()),
            format!("{MIXER_NAME}. ! {}", channels_caps(desktop.channel_count)),
        ];
        Self {
            description: segments.join(" "),
            sources: vec![desktop, mic],
        }
    }

    pub fn sources(&self) -> &[AudioSource] {
        &self.sources
    }

    pub fn is_mixed(&self) -> bool {
        self.sources.len() > 1
    }

    /// Channel count leaving the fragment.
    pub fn output_channels(&self) -> u32 {
        self.sources.first().map(|s| s.channel_count).unwrap_or(1)
    }

    pub fn as_str(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for AudioFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Resolve the audio branch for the given intent and devices.
///
/// Returns `None` when no audio is wanted, or when every wanted source lacks
/// a device. A missing device is logged and skipped; it is never an error.
pub fn resolve_audio(
    intent: CaptureIntent,
    desktop_device: Option<&AudioDevice>,
    mic_device: Option<&AudioDevice>,
) -> Option<AudioFragment> {
    let desktop = wanted_source(intent.desktop_audio, desktop_device, AudioSourceKind::Desktop)
        .map(AudioSource::desktop);
    let mic = wanted_source(intent.mic_audio, mic_device, AudioSourceKind::Mic).map(AudioSource::mic);

    match (desktop, mic) {
        (Some(desktop), Some(mic)) => Some(AudioFragment::mixed(desktop, mic)),
        (Some(source), None) | (None, Some(source)) => Some(AudioFragment::single(source)),
        (None, None) => None,
    }
}

/// Like [`resolve_audio`], querying the provider only for wanted sources.
pub fn resolve_audio_from(
    provider: &dyn AudioDeviceProvider,
    intent: CaptureIntent,
) -> Option<AudioFragment> {
    let sink = intent
        .desktop_audio
        .then(|| provider.default_sink())
        .flatten();
    let source = intent
        .mic_audio
        .then(|| provider.default_source())
        .flatten();
    resolve_audio(intent, sink.as_ref(), source.as_ref())
}

fn wanted_source(
    wanted: bool,
    device: Option<&AudioDevice>,
    kind: AudioSourceKind,
) -> Option<&AudioDevice> {
    if !wanted {
        return None;
    }
    if device.is_none() {
        tracing::warn!(%kind, "Audio requested but no default device is available; skipping");
    }
    device
}

/// Whether an audio toggle can be offered, and what to show for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureAvailability {
    Available { label: String },
    Unavailable,
}

impl FeatureAvailability {
    pub fn for_device(device: Option<&AudioDevice>) -> Self {
        match device {
            Some(device) => Self::Available {
                label: device.label(),
            },
            None => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Tooltip text for the toggle of the given source kind.
    pub fn tooltip(&self, kind: AudioSourceKind) -> String {
        match self {
            Self::Available { label } => format!("Record {kind}\n{label}"),
            Self::Unavailable => format!("Cannot record {kind}.\nNo audio device."),
        }
    }
}

/// Availability of both audio toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAvailability {
    pub desktop: FeatureAvailability,
    pub mic: FeatureAvailability,
}

impl AudioAvailability {
    pub fn query(provider: &dyn AudioDeviceProvider) -> Self {
        Self {
            desktop: FeatureAvailability::for_device(provider.default_sink().as_ref()),
            mic: FeatureAvailability::for_device(provider.default_source().as_ref()),
        }
    }
}
