//! The capture service seam.
//!
//! The engine never records anything itself: it hands a pipeline description
//! to a [`CaptureService`] and reacts to the outcome. Hosts inject the real
//! service; tests inject a scripted one.

use async_trait::async_trait;
use castmate_common::error::CastmateResult;

use crate::request::{CaptureOptions, CaptureRegion, CaptureRequest};

pub mod shell;

#[cfg(test)]
pub mod fake;

pub use shell::ShellScreencastService;

/// External screencast service.
///
/// `Ok((success, path))` means the service accepted the call; `Err` means
/// it rejected or failed to run the pipeline, which makes the engine fall
/// back to the next profile.
#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Record the whole screen.
    async fn screencast(
        &self,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)>;

    /// Record a rectangular area.
    async fn screencast_area(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)>;
}

/// Route a request to the matching service call.
pub(crate) async fn dispatch(
    service: &dyn CaptureService,
    request: &CaptureRequest,
) -> CastmateResult<(bool, String)> {
    match request.region {
        CaptureRegion::FullScreen { .. } => {
            service
                .screencast(&request.filename_stem, &request.options)
                .await
        }
        CaptureRegion::Area {
            x,
            y,
            width,
            height,
        } => {
            service
                .screencast_area(x, y, width, height, &request.filename_stem, &request.options)
                .await
        }
    }
}
