//! Encoder profiles and the ordered catalog the fallback loop walks.
//!
//! The built-in video stages follow the GNOME Shell screencast service's own
//! pipelines, split into a preparation stage (upload/convert/scale) and an
//! encode stage so a scale constraint can sit between them. `%T` is a thread
//! count placeholder the service substitutes itself.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use castmate_common::error::{CastmateError, CastmateResult};
use serde::{Deserialize, Serialize};

const AAC_PIPELINE: &str = "avenc_aac ! queue";
const VORBIS_PIPELINE: &str = "vorbisenc ! queue";
const MP4_MUXER: &str = "mp4mux fragment-duration=500 fragment-mode=first-moov-then-finalise";
const WEBM_MUXER: &str = "webmmux";

const DMABUF_GL_PREP: &str = "glupload ! glcolorconvert ! gldownload ! videoscale ! queue";
const MEMFD_PREP: &str =
    "videoconvert chroma-mode=none dither=none matrix-mode=output-only n-threads=%T ! videoscale ! queue";
const OPENH264_ENC: &str = "openh264enc deblocking=off background-detection=false complexity=low adaptive-quantization=false qp-max=26 qp-min=26 multi-thread=%T slice-mode=auto";
const VP8_ENC: &str = "vp8enc cpu-used=16 max-quantizer=17 deadline=1 keyframe-mode=disabled threads=%T static-threshold=1000 buffer-size=20000";

/// One concrete way to produce a capture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderProfile {
    /// Unique name, used in logs.
    pub id: String,
    /// Conversion/scaling stage ahead of the encoder. May be empty.
    #[serde(default)]
    pub video_prep_pipeline: String,
    /// Video encoder stage.
    pub video_pipeline: String,
    /// Audio encoder stage.
    pub audio_pipeline: String,
    /// Muxer element with its properties, without a `name=`.
    pub muxer: String,
    /// Container extension without the leading dot.
    pub file_extension: String,
}

impl EncoderProfile {
    pub fn new(
        id: impl Into<String>,
        video_prep_pipeline: impl Into<String>,
        video_pipeline: impl Into<String>,
        audio_pipeline: impl Into<String>,
        muxer: impl Into<String>,
        file_extension: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            video_prep_pipeline: video_prep_pipeline.into(),
            video_pipeline: video_pipeline.into(),
            audio_pipeline: audio_pipeline.into(),
            muxer: muxer.into(),
            file_extension: file_extension.into(),
        }
    }

    fn validate(&self) -> CastmateResult<()> {
        let required = [
            ("id", &self.id),
            ("video_pipeline", &self.video_pipeline),
            ("audio_pipeline", &self.audio_pipeline),
            ("muxer", &self.muxer),
            ("file_extension", &self.file_extension),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CastmateError::config(format!(
                    "profile {:?}: {field} must not be empty",
                    self.id
                )));
            }
        }
        // A dotted extension would be renamed again on every correction.
        if self.file_extension.contains('.') {
            return Err(CastmateError::config(format!(
                "profile {:?}: file_extension must not contain '.'",
                self.id
            )));
        }
        Ok(())
    }
}

/// Ordered, immutable list of profiles: most capable first, most portable last.
///
/// Cloning is cheap; clones share the same profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    profiles: Arc<[EncoderProfile]>,
}

impl ProfileCatalog {
    /// Build a catalog, rejecting empty lists, duplicate ids and incomplete profiles.
    pub fn new(profiles: Vec<EncoderProfile>) -> CastmateResult<Self> {
        if profiles.is_empty() {
            return Err(CastmateError::config("profile catalog must not be empty"));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            profile.validate()?;
            if !seen.insert(profile.id.as_str()) {
                return Err(CastmateError::config(format!(
                    "duplicate profile id {:?}",
                    profile.id
                )));
            }
        }

        Ok(Self {
            profiles: profiles.into(),
        })
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(json: &str) -> CastmateResult<Self> {
        let profiles: Vec<EncoderProfile> = serde_json::from_str(json)?;
        Self::new(profiles)
    }

    /// The built-in catalog. Created once per process.
    pub fn builtin() -> &'static ProfileCatalog {
        static BUILTIN: OnceLock<ProfileCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| ProfileCatalog {
            profiles: builtin_profiles().into(),
        })
    }

    /// Profiles in fallback order. Every call yields the same sequence.
    pub fn profiles(&self) -> &[EncoderProfile] {
        &self.profiles
    }

    pub fn get(&self, index: usize) -> Option<&EncoderProfile> {
        self.profiles.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&EncoderProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

fn builtin_profiles() -> Vec<EncoderProfile> {
    vec![
        EncoderProfile::new(
            "hwenc-dmabuf-h264-vaapi-lp",
            "vapostproc",
            "vah264lpenc ! queue ! h264parse",
            AAC_PIPELINE,
            MP4_MUXER,
            "mp4",
        ),
        EncoderProfile::new(
            "hwenc-dmabuf-h264-vaapi",
            "vapostproc",
            "vah264enc ! queue ! h264parse",
            AAC_PIPELINE,
            MP4_MUXER,
            "mp4",
        ),
        EncoderProfile::new(
            "swenc-dmabuf-h264-openh264",
            DMABUF_GL_PREP,
            format!("{OPENH264_ENC} ! queue ! h264parse"),
            AAC_PIPELINE,
            MP4_MUXER,
            "mp4",
        ),
        EncoderProfile::new(
            "swenc-memfd-h264-openh264",
            MEMFD_PREP,
            format!("{OPENH264_ENC} ! queue ! h264parse"),
            AAC_PIPELINE,
            MP4_MUXER,
            "mp4",
        ),
        EncoderProfile::new(
            "swenc-dmabuf-vp8-vp8enc",
            DMABUF_GL_PREP,
            format!("{VP8_ENC} ! queue"),
            VORBIS_PIPELINE,
            WEBM_MUXER,
            "webm",
        ),
        EncoderProfile::new(
            "swenc-memfd-vp8-vp8enc",
            MEMFD_PREP,
            format!("{VP8_ENC} ! queue"),
            VORBIS_PIPELINE,
            WEBM_MUXER,
            "webm",
        ),
    ]
}
