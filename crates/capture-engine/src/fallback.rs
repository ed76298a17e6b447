//! Sticky profile fallback.
//!
//! Each capture walks the catalog starting from the session's cursor. A
//! profile whose capture call fails is abandoned for the rest of the session:
//! the cursor only ever moves forward and is never reset, even after a
//! success. Once it passes the last profile every further capture fails
//! immediately.

use std::path::{Path, PathBuf};

use castmate_common::config::OutputNaming;
use castmate_common::error::{CastmateError, CastmateResult};
use castmate_platform_core::AudioDeviceProvider;
use tokio::sync::watch;

use crate::audio::{resolve_audio_from, CaptureIntent};
use crate::output::correct_output_path;
use crate::pipeline::build_pipeline;
use crate::profile::{EncoderProfile, ProfileCatalog};
use crate::request::{CaptureRequest, CaptureResult};
use crate::service::{dispatch, CaptureService};

/// Session-scoped fallback cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackState {
    cursor: usize,
}

impl FallbackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next profile to try.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Where the loop stands against `catalog`.
    pub fn phase(&self, catalog: &ProfileCatalog) -> AttemptPhase {
        if self.cursor < catalog.len() {
            AttemptPhase::Attempting(self.cursor)
        } else {
            AttemptPhase::Exhausted
        }
    }

    fn abandon_current(&mut self) {
        self.cursor += 1;
    }
}

/// Whether a session still has profiles left to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Attempting(usize),
    Exhausted,
}

/// Per-capture settings the executor applies to every attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptSettings {
    pub intent: CaptureIntent,
    /// Written to the `framerate` option when set.
    pub framerate: Option<i32>,
    pub downsize_ratio: f64,
    pub output_naming: OutputNaming,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            intent: CaptureIntent::default(),
            framerate: None,
            downsize_ratio: 1.0,
            output_naming: OutputNaming::Uniform,
        }
    }
}

/// Drives one capture request through the catalog.
pub struct FallbackExecutor<'a> {
    catalog: &'a ProfileCatalog,
    service: &'a dyn CaptureService,
    devices: &'a dyn AudioDeviceProvider,
    settings: AttemptSettings,
    teardown: Option<watch::Receiver<bool>>,
}

impl<'a> FallbackExecutor<'a> {
    pub fn new(
        catalog: &'a ProfileCatalog,
        service: &'a dyn CaptureService,
        devices: &'a dyn AudioDeviceProvider,
        settings: AttemptSettings,
    ) -> Self {
        Self {
            catalog,
            service,
            devices,
            settings,
            teardown: None,
        }
    }

    /// Abandon the capture when `teardown` flips to `true` or its sender is dropped.
    pub fn with_teardown(mut self, teardown: watch::Receiver<bool>) -> Self {
        self.teardown = Some(teardown);
        self
    }

    /// Run attempts until one is accepted or the catalog is exhausted.
    ///
    /// The pipeline and frame rate of the last attempt are left in
    /// `request.options`.
    pub async fn run(
        &self,
        state: &mut FallbackState,
        request: &mut CaptureRequest,
    ) -> CastmateResult<CaptureResult> {
        loop {
            let index = state.cursor();
            let Some(profile) = self.catalog.get(index) else {
                tracing::error!(
                    profiles = self.catalog.len(),
                    "All pipeline configurations failed"
                );
                return Err(CastmateError::AllConfigurationsFailed {
                    attempted: self.catalog.len(),
                });
            };

            self.ensure_live()?;

            // Devices can change between attempts; resolve them fresh each time.
            let audio = resolve_audio_from(self.devices, self.settings.intent);
            let (width, height) = request.region.dimensions();
            let pipeline = build_pipeline(
                profile,
                audio.as_ref(),
                width,
                height,
                self.settings.downsize_ratio,
            );
            request.options.set_pipeline(pipeline.clone());
            if let Some(framerate) = self.settings.framerate {
                request.options.set_framerate(framerate);
            }

            tracing::info!(profile = %profile.id, index, "Attempting capture");
            tracing::debug!(profile = %profile.id, %pipeline, "Pipeline description");

            match self.call_service(request).await {
                Ok((true, raw_path)) => {
                    tracing::info!(profile = %profile.id, path = %raw_path, "Capture succeeded");
                    let path = self.finalize_path(profile, &raw_path, audio.is_some());
                    return Ok(CaptureResult {
                        success: true,
                        path,
                        profile_id: profile.id.clone(),
                    });
                }
                Ok((false, raw_path)) => {
                    tracing::warn!(
                        profile = %profile.id,
                        path = %raw_path,
                        "Capture service reported an unsuccessful capture"
                    );
                    return Ok(CaptureResult {
                        success: false,
                        path: PathBuf::from(raw_path),
                        profile_id: profile.id.clone(),
                    });
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        profile = %profile.id,
                        index,
                        %pipeline,
                        error = %e,
                        "Capture failed with this configuration; trying the next one"
                    );
                    state.abandon_current();
                }
            }
        }
    }

    fn ensure_live(&self) -> CastmateResult<()> {
        match &self.teardown {
            Some(teardown) if *teardown.borrow() => Err(CastmateError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn call_service(&self, request: &CaptureRequest) -> CastmateResult<(bool, String)> {
        let call = dispatch(self.service, request);
        let Some(teardown) = &self.teardown else {
            return call.await;
        };

        let mut teardown = teardown.clone();
        tokio::select! {
            result = call => result,
            _ = teardown.wait_for(|torn_down| *torn_down) => {
                tracing::info!("Session torn down during capture; discarding the pending attempt");
                Err(CastmateError::Cancelled)
            }
        }
    }

    fn finalize_path(&self, profile: &EncoderProfile, raw_path: &str, has_audio: bool) -> PathBuf {
        let raw = Path::new(raw_path);
        if self.settings.output_naming == OutputNaming::SkipWithoutAudio && !has_audio {
            return raw.to_path_buf();
        }

        match correct_output_path(raw, &profile.file_extension) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    path = %raw_path,
                    extension = %profile.file_extension,
                    error = %e,
                    "Could not rename capture output; keeping the service's name"
                );
                raw.to_path_buf()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::FakeCaptureService;
    use castmate_platform_core::{AudioDevice, StaticDeviceProvider};
    use proptest::prelude::*;

    fn two_profile_catalog() -> ProfileCatalog {
        ProfileCatalog::new(vec![
            EncoderProfile::new("hw-h264", "vapostproc", "vah264enc ! h264parse", "avenc_aac ! queue", "mp4mux", "mp4"),
            EncoderProfile::new("sw-vp8", "videoconvert ! videoscale ! queue", "vp8enc ! queue", "vorbisenc ! queue", "webmmux", "webm"),
        ])
        .unwrap()
    }

    fn no_devices() -> StaticDeviceProvider {
        StaticDeviceProvider::default()
    }

    #[tokio::test]
    async fn success_leaves_cursor_in_place() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new();
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());

        let mut state = FallbackState::new();
        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        let result = executor.run(&mut state, &mut request).await.unwrap();

        assert!(result.success);
        assert_eq!(result.profile_id, "hw-h264");
        assert_eq!(state.cursor(), 0);
    }

    #[tokio::test]
    async fn cursor_sticks_across_requests() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new().failing_on("vah264enc");
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());
        let mut state = FallbackState::new();

        let mut first = CaptureRequest::full_screen(1920, 1080, "first");
        executor.run(&mut state, &mut first).await.unwrap();
        let mut second = CaptureRequest::area(0, 0, 640, 480, "second");
        let result = executor.run(&mut state, &mut second).await.unwrap();

        assert_eq!(result.profile_id, "sw-vp8");
        assert_eq!(state.cursor(), 1);
        // hw-h264 is tried once for the whole session, not once per request.
        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].area, Some((0, 0, 640, 480)));
        assert!(calls[2].pipeline.as_deref().unwrap().contains("vp8enc"));
    }

    #[tokio::test]
    async fn exhaustion_is_terminal_and_cursor_stops_at_len() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new()
            .failing_on("vah264enc")
            .failing_on("vp8enc");
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        let err = executor.run(&mut state, &mut request).await.unwrap_err();
        assert!(matches!(err, CastmateError::AllConfigurationsFailed { attempted: 2 }));
        assert_eq!(state.cursor(), 2);
        assert_eq!(state.phase(&catalog), AttemptPhase::Exhausted);

        // No further retries in the same session.
        let err = executor.run(&mut state, &mut request).await.unwrap_err();
        assert!(matches!(err, CastmateError::AllConfigurationsFailed { .. }));
        assert_eq!(service.calls().len(), 2);
        assert_eq!(state.cursor(), 2);
    }

    #[tokio::test]
    async fn declined_capture_is_returned_without_fallback() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new().declining();
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        let result = executor.run(&mut state, &mut request).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.path, PathBuf::from("/tmp/cast.unknown"));
        assert_eq!(state.cursor(), 0);
    }

    #[tokio::test]
    async fn framerate_and_audio_are_injected() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new();
        let devices = StaticDeviceProvider::new(Some(AudioDevice::new("speakers", 2)), None);
        let settings = AttemptSettings {
            intent: CaptureIntent::new(true, false),
            framerate: Some(60),
            ..AttemptSettings::default()
        };
        let executor = FallbackExecutor::new(&catalog, &service, &devices, settings);
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        request.options.insert("draw-cursor", true);
        executor.run(&mut state, &mut request).await.unwrap();

        assert_eq!(request.options.framerate(), Some(60));
        assert!(request
            .options
            .pipeline()
            .unwrap()
            .contains("pulsesrc device=speakers.monitor"));
        assert!(request.options.get("draw-cursor").is_some());
        assert_eq!(service.calls()[0].framerate, Some(60));
    }

    #[tokio::test]
    async fn missing_output_file_keeps_raw_path() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new();
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "castmate-missing-output");
        let result = executor.run(&mut state, &mut request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.path, PathBuf::from("/tmp/castmate-missing-output.unknown"));
    }

    #[tokio::test]
    async fn success_renames_output_to_profile_extension() {
        let dir = std::env::temp_dir().join(format!("castmate-fallback-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new()
            .failing_on("vah264enc")
            .writing_into(dir.clone());
        let devices = no_devices();
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default());
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "renamed");
        let result = executor.run(&mut state, &mut request).await.unwrap();

        assert_eq!(result.path, dir.join("renamed.webm"));
        assert!(result.path.exists());
        assert!(!dir.join("renamed.unknown").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn skip_without_audio_leaves_name_alone() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new();
        let devices = no_devices();
        let settings = AttemptSettings {
            output_naming: OutputNaming::SkipWithoutAudio,
            ..AttemptSettings::default()
        };
        let executor = FallbackExecutor::new(&catalog, &service, &devices, settings);
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        let result = executor.run(&mut state, &mut request).await.unwrap();
        assert_eq!(result.path, PathBuf::from("/tmp/cast.unknown"));
    }

    #[tokio::test]
    async fn teardown_cancels_pending_attempt_without_advancing() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new().hanging();
        let devices = no_devices();
        let (teardown_tx, teardown_rx) = watch::channel(false);
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default())
            .with_teardown(teardown_rx);
        let mut state = FallbackState::new();
        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");

        let (result, ()) = tokio::join!(executor.run(&mut state, &mut request), async {
            service.call_entered().await;
            teardown_tx.send_replace(true);
        });

        assert!(matches!(result, Err(CastmateError::Cancelled)));
        assert_eq!(state.cursor(), 0);
    }

    #[tokio::test]
    async fn torn_down_session_does_not_call_service() {
        let catalog = two_profile_catalog();
        let service = FakeCaptureService::new();
        let devices = no_devices();
        let (teardown_tx, teardown_rx) = watch::channel(true);
        let executor = FallbackExecutor::new(&catalog, &service, &devices, AttemptSettings::default())
            .with_teardown(teardown_rx);
        let mut state = FallbackState::new();

        let mut request = CaptureRequest::full_screen(1920, 1080, "cast");
        let err = executor.run(&mut state, &mut request).await.unwrap_err();
        assert!(matches!(err, CastmateError::Cancelled));
        assert!(service.calls().is_empty());
        drop(teardown_tx);
    }

    proptest! {
        #[test]
        fn cursor_never_decreases(failures in prop::collection::vec(0usize..4, 1..12)) {
            // Each entry is how many profiles the machine lacks at that call.
            let catalog = ProfileCatalog::builtin();
            let devices = no_devices();
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let mut state = FallbackState::new();
            let mut previous = state.cursor();

            for missing in failures {
                let mut service = FakeCaptureService::new();
                for profile in &catalog.profiles()[..missing] {
                    let encoder = profile.video_pipeline.split_whitespace().next().unwrap();
                    service = service.failing_on(encoder);
                }
                let executor = FallbackExecutor::new(catalog, &service, &devices, AttemptSettings::default());
                let mut request = CaptureRequest::full_screen(1280, 720, "cast");
                let _ = runtime.block_on(executor.run(&mut state, &mut request));

                prop_assert!(state.cursor() >= previous);
                prop_assert!(state.cursor() <= catalog.len());
                previous = state.cursor();
            }
        }
    }
}
