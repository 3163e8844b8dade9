//! Driver Monitoring System (DMS)
//!
//! Eye-closure and drowsiness detection from facial landmarks:
//! - Eye geometry extraction from a fixed-topology landmark set
//! - Eye aspect ratio (EAR) open/closed classification
//! - Consecutive-closed-frame counter with level-triggered sleep events
//! - Single-owner session task for multi-threaded hosts

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod landmark;
pub mod session;
pub mod state;

pub use analysis::{Event, EyeReading, FrameAnalysis};
pub use config::DmsConfig;
pub use detector::SleepDetector;
pub use ear::{classify_eye, eye_aspect_ratio, EyeClosure, FrameSignal, MIN_RATIO};
pub use landmark::{extract_eyes, EyeIndices, EyeQuad, FaceTopology, Landmark, LandmarkSet};
pub use session::{spawn_session, FrameResult, SessionHandle, SessionTask};
pub use state::{DrowsinessLevel, DrowsinessState, THRESHOLD_FRAMES};

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Landmark index {index} out of range for set of {len} points")]
    OutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection session closed")]
    SessionClosed,

    #[error("Detection session failed: {0}")]
    Session(String),
}

impl From<::config::ConfigError> for DmsError {
    fn from(e: ::config::ConfigError) -> Self {
        DmsError::Config(e.to_string())
    }
}
