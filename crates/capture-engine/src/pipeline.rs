//! Pipeline description assembly.
//!
//! The capture service prepends its own video source to the first segment
//! and appends a file sink to the last one, so the description produced here
//! starts at the video prep stage and ends at the muxer. With audio it is
//! made of three space separated segments:
//!
//! ```text
//! <prep> ! [<scale caps> !] <encode> ! <muxer> name=mux   video -> mux
//! <audio sources> ! <audio encode> ! mux.                 audio -> mux
//! mux.                                                    mux -> file sink
//! ```
//!
//! The layout is what the service expects; it is not a free-form template.

use crate::audio::AudioFragment;
use crate::profile::EncoderProfile;

/// Name given to the muxer element so other segments can link to it.
pub const MUXER_NAME: &str = "mux";

/// Output size after applying `ratio`, rounding down. Never returns zero.
pub fn scaled_dimensions(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    let scale = |value: u32| ((value as f64) * ratio).floor().max(1.0) as u32;
    (scale(width), scale(height))
}

/// A ratio of exactly 1.0 means "record at native size".
pub fn is_native_scale(ratio: f64) -> bool {
    (ratio - 1.0).abs() < f64::EPSILON
}

/// Build the pipeline description for one profile.
///
/// Pure: the same inputs always give the same string, and it cannot fail.
pub fn build_pipeline(
    profile: &EncoderProfile,
    audio: Option<&AudioFragment>,
    width: u32,
    height: u32,
    downsize_ratio: f64,
) -> String {
    let video = video_segment(profile, width, height, downsize_ratio);

    match audio {
        None => video,
        Some(audio) => [
            video,
            format!("{audio} ! {} ! {MUXER_NAME}.", profile.audio_pipeline),
            format!("{MUXER_NAME}."),
        ]
        .join(" "),
    }
}

fn video_segment(profile: &EncoderProfile, width: u32, height: u32, ratio: f64) -> String {
    let mut stages: Vec<String> = Vec::with_capacity(4);

    let prep = profile.video_prep_pipeline.trim();
    if !prep.is_empty() {
        stages.push(prep.to_string());
    }

    if !is_native_scale(ratio) {
        let (scaled_width, scaled_height) = scaled_dimensions(width, height, ratio);
        stages.push(format!(
            "capsfilter caps=video/x-raw,width={scaled_width},height={scaled_height}"
        ));
    }

    stages.push(profile.video_pipeline.clone());
    stages.push(format!("{} name={MUXER_NAME}", profile.muxer));
    stages.join(" ! ")
}
