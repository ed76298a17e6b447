//! Default audio device lookup through `pactl`.
//!
//! Works against PulseAudio and against PipeWire through its PulseAudio
//! compatibility server. Only the default sink and source are resolved, with
//! their channel count, description and active port.

use std::process::Command;

use anyhow::{bail, Context};
use castmate_common::error::{CastmateError, CastmateResult};
use castmate_platform_core::{
    AudioDevice, AudioDeviceProvider, DeviceListener, DeviceSubscription, StaticDeviceProvider,
};

/// Device provider backed by the `pactl` command line tool.
///
/// Lookups are served from a cache; [`PactlDeviceProvider::refresh`]
/// re-queries the sound server and notifies subscribers of changes.
#[derive(Debug, Default)]
pub struct PactlDeviceProvider {
    cache: StaticDeviceProvider,
}

impl PactlDeviceProvider {
    /// Create the provider and query the current defaults once.
    ///
    /// A missing or failing `pactl` leaves both defaults empty, which the
    /// engine treats as "no audio device".
    pub fn new() -> Self {
        let provider = Self::default();
        if let Err(e) = provider.refresh() {
            tracing::warn!(error = %e, "Could not query default audio devices");
        }
        provider
    }

    /// Re-read the default sink and source.
    pub fn refresh(&self) -> CastmateResult<()> {
        let info = pactl(&["info"])?;
        let defaults = parse_defaults(&info);

        let sink = match defaults.sink {
            Some(name) => find_device(&pactl(&["list", "sinks"])?, &name),
            None => None,
        };
        let source = match defaults.source {
            Some(name) => find_device(&pactl(&["list", "sources"])?, &name),
            None => None,
        };

        tracing::debug!(
            sink = sink.as_ref().map(|d| d.name.as_str()),
            source = source.as_ref().map(|d| d.name.as_str()),
            "Refreshed default audio devices"
        );

        self.cache.set_default_sink(sink);
        self.cache.set_default_source(source);
        Ok(())
    }
}

impl AudioDeviceProvider for PactlDeviceProvider {
    fn default_sink(&self) -> Option<AudioDevice> {
        self.cache.default_sink()
    }

    fn default_source(&self) -> Option<AudioDevice> {
        self.cache.default_source()
    }

    fn subscribe(&self, listener: DeviceListener) -> DeviceSubscription {
        self.cache.subscribe(listener)
    }
}

fn pactl(args: &[&str]) -> CastmateResult<String> {
    query_sound_server("pactl", args)
}

/// Run a sound server tool, reporting any failure as a device error.
fn query_sound_server(program: &str, args: &[&str]) -> CastmateResult<String> {
    run_tool(program, args).map_err(|e| CastmateError::device(format!("{e:#}")))
}

fn run_tool(program: &str, args: &[&str]) -> anyhow::Result<String> {
    // Field names are localized; force the C locale so parsing is stable.
    let output = Command::new(program)
        .env("LC_ALL", "C")
        .args(args)
        .output()
        .with_context(|| format!("failed to run {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Defaults {
    sink: Option<String>,
    source: Option<String>,
}

/// Extract `Default Sink:` / `Default Source:` from `pactl info`.
fn parse_defaults(info: &str) -> Defaults {
    let mut defaults = Defaults::default();
    for line in info.lines() {
        if let Some(name) = line.strip_prefix("Default Sink:") {
            defaults.sink = non_empty(name);
        } else if let Some(name) = line.strip_prefix("Default Source:") {
            defaults.source = non_empty(name);
        }
    }
    defaults
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != "@DEFAULT_SINK@" && value != "@DEFAULT_SOURCE@")
        .then(|| value.to_string())
}

fn find_device(listing: &str, name: &str) -> Option<AudioDevice> {
    parse_device_list(listing)
        .into_iter()
        .find(|device| device.name == name)
}

/// Parse the long form of `pactl list sinks` / `pactl list sources`.
///
/// Blocks without a name or a channel count are skipped.
fn parse_device_list(listing: &str) -> Vec<AudioDevice> {
    let mut devices = Vec::new();
    let mut block = DeviceBlock::default();

    for line in listing.lines() {
        if !line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
            // "Sink #55" / "Source #56" starts a new block.
            devices.extend(block.finish());
            block = DeviceBlock::default();
            continue;
        }
        block.feed(line);
    }
    devices.extend(block.finish());
    devices
}

#[derive(Default)]
struct DeviceBlock {
    name: Option<String>,
    description: Option<String>,
    channels: Option<u32>,
    active_port: Option<String>,
    ports: Vec<(String, String)>,
    in_ports: bool,
}

impl DeviceBlock {
    fn feed(&mut self, line: &str) {
        let depth = line.chars().take_while(|c| *c == '\t').count();
        let trimmed = line.trim();

        if depth >= 2 && self.in_ports {
            // "\t\tanalog-output-speaker: Speakers (type: Speaker, priority: 10000, ...)"
            if let Some((port, rest)) = trimmed.split_once(": ") {
                let human = rest.split(" (").next().unwrap_or(rest).trim();
                self.ports.push((port.to_string(), human.to_string()));
            }
            return;
        }
        self.in_ports = false;

        if let Some(value) = trimmed.strip_prefix("Name:") {
            self.name = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Description:") {
            self.description = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Sample Specification:") {
            self.channels = parse_channels(value);
        } else if let Some(value) = trimmed.strip_prefix("Active Port:") {
            self.active_port = Some(value.trim().to_string());
        } else if trimmed == "Ports:" {
            self.in_ports = true;
        }
    }

    fn finish(self) -> Option<AudioDevice> {
        let name = self.name?;
        let channels = self.channels?;
        let mut device = AudioDevice::new(name, channels);
        if let Some(description) = self.description {
            device = device.with_description(description);
        }
        if let Some(active) = self.active_port {
            let human = self
                .ports
                .iter()
                .find(|(port, _)| *port == active)
                .map(|(_, human)| human.clone())
                .unwrap_or(active);
            device = device.with_port(human);
        }
        Some(device)
    }
}

/// `"s16le 2ch 44100Hz"` -> `Some(2)`.
fn parse_channels(spec: &str) -> Option<u32> {
    spec.split_whitespace()
        .find_map(|token| token.strip_suffix("ch"))
        .and_then(|count| count.parse::<u32>().ok())
        .filter(|count| *count > 0)
}
