// Scripted capture service for unit tests.
//
// Fails any call whose pipeline contains one of the configured markers, and
// records every call it receives.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use castmate_common::error::{CastmateError, CastmateResult};
use tokio::sync::Notify;

use crate::request::CaptureOptions;
use crate::service::CaptureService;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub filename_stem: String,
    pub area: Option<(i32, i32, u32, u32)>,
    pub pipeline: Option<String>,
    pub framerate: Option<i32>,
}

#[derive(Debug, Default)]
pub struct FakeCaptureService {
    failing_markers: Vec<String>,
    output_dir: Option<PathBuf>,
    decline: bool,
    hang: bool,
    calls: Mutex<Vec<RecordedCall>>,
    entered: Notify,
}

impl FakeCaptureService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every pipeline containing `marker`.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.failing_markers.push(marker.to_string());
        self
    }

    /// Write an `.unknown` file into `dir` on success so renames can be observed.
    pub fn writing_into(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    /// Return `(false, path)` instead of succeeding.
    pub fn declining(mut self) -> Self {
        self.decline = true;
        self
    }

    /// Never complete a call.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Resolves once a call has been received.
    pub async fn call_entered(&self) {
        self.entered.notified().await;
    }

    async fn handle(&self, call: RecordedCall) -> CastmateResult<(bool, String)> {
        self.calls.lock().unwrap().push(call.clone());
        self.entered.notify_one();

        if self.hang {
            std::future::pending::<()>().await;
        }

        let pipeline = call.pipeline.unwrap_or_default();
        if let Some(marker) = self
            .failing_markers
            .iter()
            .find(|marker| pipeline.contains(marker.as_str()))
        {
            return Err(CastmateError::capture(format!(
                "no element \"{marker}\""
            )));
        }

        let path = match &self.output_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.unknown", call.filename_stem));
                std::fs::write(&path, b"capture")?;
                path
            }
            None => PathBuf::from(format!("/tmp/{}.unknown", call.filename_stem)),
        };

        Ok((!self.decline, path.to_string_lossy().into_owned()))
    }
}

#[async_trait]
impl CaptureService for FakeCaptureService {
    async fn screencast(
        &self,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)> {
        self.handle(RecordedCall {
            filename_stem: filename_stem.to_string(),
            area: None,
            pipeline: options.pipeline().map(str::to_string),
            framerate: options.framerate(),
        })
        .await
    }

    async fn screencast_area(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)> {
        self.handle(RecordedCall {
            filename_stem: filename_stem.to_string(),
            area: Some((x, y, width, height)),
            pipeline: options.pipeline().map(str::to_string),
            framerate: options.framerate(),
        })
        .await
    }
}
