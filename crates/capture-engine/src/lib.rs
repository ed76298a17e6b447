//! Castmate Capture Engine
//!
//! Decides how a screencast should be encoded and drives an external capture
//! service until one encoder configuration works. The engine never touches
//! media itself: it produces pipeline descriptions, hands them to the
//! service, and fixes up the file the service wrote.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                  CaptureSession                   │
//! │  ┌────────────────────────────────────────────┐   │
//! │  │ FallbackExecutor (sticky cursor)           │   │
//! │  │   ProfileCatalog[cursor]                   │   │
//! │  │   resolve_audio ──┐                        │   │
//! │  │                   ▼                        │   │
//! │  │   build_pipeline ──► CaptureService ──┐    │   │
//! │  │        ▲ failure: cursor += 1 ────────┘    │   │
//! │  └──────────────────────────┬─────────────────┘   │
//! │                             ▼ success             │
//! │                 correct_output_path               │
//! └───────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod fallback;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod request;
pub mod service;
pub mod session;

pub use audio::{
    resolve_audio, resolve_audio_from, AudioAvailability, AudioFragment, AudioSource,
    AudioSourceKind, CaptureIntent, FeatureAvailability,
};
pub use fallback::{AttemptPhase, AttemptSettings, FallbackExecutor, FallbackState};
pub use output::{correct_output_path, corrected_path};
pub use pipeline::{build_pipeline, scaled_dimensions};
pub use profile::{EncoderProfile, ProfileCatalog};
pub use request::{CaptureOptions, CaptureRegion, CaptureRequest, CaptureResult, OptionValue};
pub use service::{CaptureService, ShellScreencastService};
pub use session::{CaptureSession, CaptureSettings, SessionState, TeardownHandle};
