//! Capture session management.

use std::sync::{Arc, Mutex};

use castmate_common::config::{
    validate_downsize_ratio, validate_framerate, CaptureDefaults, OutputNaming,
};
use castmate_common::error::{CastmateError, CastmateResult};
use castmate_platform_core::{AudioDeviceProvider, DeviceEvent, DeviceListener, DeviceSubscription};
use tokio::sync::watch;

use crate::audio::{AudioAvailability, CaptureIntent, FeatureAvailability};
use crate::fallback::{AttemptPhase, AttemptSettings, FallbackExecutor, FallbackState};
use crate::profile::ProfileCatalog;
use crate::request::{CaptureRequest, CaptureResult};
use crate::service::CaptureService;

/// User-adjustable capture settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    /// Which audio sources to record.
    pub intent: CaptureIntent,

    /// Frame rate handed to the capture service, if any.
    pub framerate: Option<u32>,

    /// Output scale factor in `(0, 1]`.
    pub downsize_ratio: f64,
}

impl CaptureSettings {
    pub fn from_defaults(defaults: &CaptureDefaults) -> Self {
        Self {
            intent: CaptureIntent::default(),
            framerate: defaults.framerate,
            downsize_ratio: defaults.downsize_ratio,
        }
    }

    pub fn validate(&self) -> CastmateResult<()> {
        if let Some(fps) = self.framerate {
            validate_framerate(fps)?;
        }
        validate_downsize_ratio(self.downsize_ratio)
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_defaults(&CaptureDefaults::default())
    }
}

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Profiles remain; the next capture starts at the given index.
    Ready { next_profile: usize },
    /// Every profile has failed. Captures fail until a new session is created.
    Exhausted,
    /// The session was shut down.
    Closed,
}

/// Signals a session to stop from another task.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl TeardownHandle {
    /// Abandon any capture in flight and refuse new ones.
    pub fn teardown(&self) {
        self.sender.send_replace(true);
    }
}

/// A capture session.
///
/// Owns the sticky fallback cursor: a profile that fails once is skipped by
/// every later capture in the same session.
pub struct CaptureSession {
    catalog: ProfileCatalog,
    service: Arc<dyn CaptureService>,
    devices: Arc<dyn AudioDeviceProvider>,
    settings: CaptureSettings,
    output_naming: OutputNaming,
    fallback: FallbackState,
    teardown: Arc<watch::Sender<bool>>,
    availability: Arc<Mutex<AudioAvailability>>,
    device_subscription: Option<DeviceSubscription>,
}

impl CaptureSession {
    /// Create a session over the built-in profile catalog.
    pub fn new(
        service: Arc<dyn CaptureService>,
        devices: Arc<dyn AudioDeviceProvider>,
        defaults: &CaptureDefaults,
    ) -> CastmateResult<Self> {
        let settings = CaptureSettings::from_defaults(defaults);
        settings.validate()?;

        let availability = Arc::new(Mutex::new(AudioAvailability::query(devices.as_ref())));
        let device_subscription = devices.subscribe(availability_listener(availability.clone()));
        let (teardown, _) = watch::channel(false);

        tracing::debug!(
            framerate = ?settings.framerate,
            downsize_ratio = settings.downsize_ratio,
            "Capture session created"
        );

        Ok(Self {
            catalog: ProfileCatalog::default(),
            service,
            devices,
            settings,
            output_naming: defaults.output_naming,
            fallback: FallbackState::new(),
            teardown: Arc::new(teardown),
            availability,
            device_subscription: Some(device_subscription),
        })
    }

    /// Replace the profile catalog.
    ///
    /// Refused once a profile has been abandoned, since the cursor would
    /// otherwise move back to the start of the new catalog.
    pub fn with_catalog(mut self, catalog: ProfileCatalog) -> CastmateResult<Self> {
        if self.fallback.cursor() > 0 {
            return Err(CastmateError::config(format!(
                "cannot replace the profile catalog after {} profile(s) were abandoned",
                self.fallback.cursor()
            )));
        }
        self.catalog = catalog;
        Ok(self)
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn set_intent(&mut self, intent: CaptureIntent) {
        self.settings.intent = intent;
    }

    pub fn set_framerate(&mut self, framerate: Option<u32>) -> CastmateResult<()> {
        if let Some(fps) = framerate {
            validate_framerate(fps)?;
        }
        self.settings.framerate = framerate;
        Ok(())
    }

    pub fn set_downsize_ratio(&mut self, ratio: f64) -> CastmateResult<()> {
        validate_downsize_ratio(ratio)?;
        self.settings.downsize_ratio = ratio;
        Ok(())
    }

    pub fn set_output_naming(&mut self, naming: OutputNaming) {
        self.output_naming = naming;
    }

    /// Index of the next profile to try.
    pub fn cursor(&self) -> usize {
        self.fallback.cursor()
    }

    pub fn state(&self) -> SessionState {
        if *self.teardown.borrow() {
            return SessionState::Closed;
        }
        match self.fallback.phase(&self.catalog) {
            AttemptPhase::Attempting(next_profile) => SessionState::Ready { next_profile },
            AttemptPhase::Exhausted => SessionState::Exhausted,
        }
    }

    /// Current availability of the audio toggles, kept up to date with
    /// default-device changes.
    pub fn availability(&self) -> AudioAvailability {
        self.availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            sender: self.teardown.clone(),
        }
    }

    /// Run one capture through the fallback loop.
    ///
    /// On return `request.options` holds the pipeline and frame rate of the
    /// last attempt.
    pub async fn capture(&mut self, request: &mut CaptureRequest) -> CastmateResult<CaptureResult> {
        let settings = self.attempt_settings()?;
        let executor = FallbackExecutor::new(
            &self.catalog,
            self.service.as_ref(),
            self.devices.as_ref(),
            settings,
        )
        .with_teardown(self.teardown.subscribe());

        executor.run(&mut self.fallback, request).await
    }

    /// Stop the session: cancel any capture in flight and release the
    /// device subscription.
    pub fn shutdown(&mut self) {
        self.teardown.send_replace(true);
        if let Some(subscription) = self.device_subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("Capture session shut down");
        }
    }

    fn attempt_settings(&self) -> CastmateResult<AttemptSettings> {
        let framerate = self
            .settings
            .framerate
            .map(i32::try_from)
            .transpose()
            .map_err(|_| CastmateError::config("framerate does not fit in a 32-bit integer"))?;

        Ok(AttemptSettings {
            intent: self.settings.intent,
            framerate,
            downsize_ratio: self.settings.downsize_ratio,
            output_naming: self.output_naming,
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn availability_listener(availability: Arc<Mutex<AudioAvailability>>) -> DeviceListener {
    Arc::new(move |event: &DeviceEvent| {
        let mut availability = availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match event {
            DeviceEvent::DefaultSinkChanged(sink) => {
                availability.desktop = FeatureAvailability::for_device(sink.as_ref());
            }
            DeviceEvent::DefaultSourceChanged(source) => {
                availability.mic = FeatureAvailability::for_device(source.as_ref());
            }
        }
    })
}
