//! Eye aspect ratio (EAR) classification
//!
//! EAR = |upper - lower| / |outer - inner|, computed on normalized
//! coordinates. The ratio is scale invariant, so no pixel conversion
//! is needed. An eye is closed when its ratio drops below the
//! configured minimum (0.15 by default).

use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::landmark::EyeQuad;

/// Default closed-eye ratio threshold (vertical 15 : horizontal 85 eye)
pub const MIN_RATIO: f32 = 0.15;

/// Corner distances at or below this are treated as collapsed landmarks
pub const MIN_HORIZONTAL_DISTANCE: f32 = 1e-6;

/// Classification result for one eye
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EyeClosure {
    /// Ratio computed from usable geometry
    Determinate { ratio: f32, closed: bool },
    /// Degenerate geometry, no signal for this frame
    Indeterminate,
}

impl EyeClosure {
    pub fn ratio(&self) -> Option<f32> {
        match self {
            EyeClosure::Determinate { ratio, .. } => Some(*ratio),
            EyeClosure::Indeterminate => None,
        }
    }

    pub fn is_closed(&self) -> Option<bool> {
        match self {
            EyeClosure::Determinate { closed, .. } => Some(*closed),
            EyeClosure::Indeterminate => None,
        }
    }
}

/// Combined per-frame signal for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSignal {
    Determinate { both_closed: bool },
    Indeterminate,
}

impl FrameSignal {
    /// Both eyes must be determinate; closed only if both are closed
    pub fn combine(left: EyeClosure, right: EyeClosure) -> Self {
        match (left.is_closed(), right.is_closed()) {
            (Some(l), Some(r)) => FrameSignal::Determinate { both_closed: l && r },
            _ => FrameSignal::Indeterminate,
        }
    }
}

/// Eye aspect ratio of a quad, or `None` for degenerate geometry
pub fn eye_aspect_ratio(quad: &EyeQuad) -> Option<f32> {
    let horizontal = quad.horizontal();
    let vertical = quad.vertical();

    if !horizontal.is_finite() || !vertical.is_finite() || horizontal <= MIN_HORIZONTAL_DISTANCE {
        debug!("Degenerate eye geometry: v={} h={}", vertical, horizontal);
        return None;
    }

    let ratio = vertical / horizontal;
    debug!("Eye ratio: v={} h={} r={}", vertical, horizontal, ratio);
    ratio.is_finite().then_some(ratio)
}

/// Classify one eye against `min_ratio`
pub fn classify_eye(quad: &EyeQuad, min_ratio: f32) -> EyeClosure {
    match eye_aspect_ratio(quad) {
        Some(ratio) => EyeClosure::Determinate {
            ratio,
            closed: ratio < min_ratio,
        },
        None => EyeClosure::Indeterminate,
    }
}
