//! DMS configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use crate::ear::MIN_RATIO;
use crate::landmark::FaceTopology;
use crate::state::THRESHOLD_FRAMES;
use crate::DmsError;

/// Environment variable prefix for overrides, e.g. `DMS__MIN_RATIO=0.2`
pub const ENV_PREFIX: &str = "DMS";

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which an eye counts as closed
    pub min_ratio: f32,

    /// Consecutive both-eyes-closed frames before sleep is reported.
    /// A frame count, so the real duration depends on the upstream frame rate.
    pub threshold_frames: u32,

    /// Landmark indices of the eye corners and lids
    pub topology: FaceTopology,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            min_ratio: MIN_RATIO,
            threshold_frames: THRESHOLD_FRAMES,
            topology: FaceTopology::FACE_MESH,
        }
    }
}

impl DmsConfig {
    /// Create strict config (reports sleep sooner)
    pub fn strict() -> Self {
        Self {
            min_ratio: 0.18,
            threshold_frames: 20,
            ..Default::default()
        }
    }

    /// Create lenient config (needs longer closure)
    pub fn lenient() -> Self {
        Self {
            min_ratio: 0.12,
            threshold_frames: 45,
            ..Default::default()
        }
    }

    /// Load from an optional file, then `DMS__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, DmsError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config: DmsConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        info!("Loaded DMS config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.min_ratio.is_finite() || self.min_ratio <= 0.0 {
            return Err(DmsError::Config(format!(
                "min_ratio must be a positive number, got {}",
                self.min_ratio
            )));
        }
        if self.threshold_frames == 0 {
            return Err(DmsError::Config("threshold_frames must be at least 1".into()));
        }
        Ok(())
    }

    /// Wall-clock time the frame threshold spans at `fps`. Display only.
    pub fn threshold_duration_at(&self, fps: f32) -> Option<Duration> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f32(self.threshold_frames as f32 / fps).ok()
    }
}
