//! DMS events and per-frame analysis results

use std::fmt;

use serde::{Deserialize, Serialize};
use crate::ear::EyeClosure;
use crate::state::DrowsinessLevel;

/// Event emitted for each processed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// At least one eye open; closed-frame counter reset
    EyeOpen,

    /// Both eyes closed, counter below threshold
    EyeClose,

    /// Both eyes closed with the counter at threshold.
    /// Repeats every frame while the eyes stay closed.
    Sleep,

    /// No usable signal (degenerate geometry or no face)
    None,
}

impl Event {
    /// Whether this frame reported both eyes closed
    pub fn eyes_closed(&self) -> bool {
        matches!(self, Event::EyeClose | Event::Sleep)
    }

    /// Whether the host should raise an alarm (vibration, sound)
    pub fn is_alarm(&self) -> bool {
        matches!(self, Event::Sleep)
    }

    /// Notifications in firing order. A sleep frame is also a closed frame.
    pub fn emitted(&self) -> &'static [Event] {
        match self {
            Event::EyeOpen => &[Event::EyeOpen],
            Event::EyeClose => &[Event::EyeClose],
            Event::Sleep => &[Event::EyeClose, Event::Sleep],
            Event::None => &[],
        }
    }

    /// Status text for display
    pub fn status(&self) -> &'static str {
        match self {
            Event::EyeOpen => "Eyes open",
            Event::EyeClose => "Eyes closed",
            Event::Sleep => "Sleeping",
            Event::None => "",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

/// Classification of one eye for a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeReading {
    /// Eye aspect ratio, absent for degenerate geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f32>,
    /// Closed flag, absent for degenerate geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

impl From<EyeClosure> for EyeReading {
    fn from(c: EyeClosure) -> Self {
        Self {
            ratio: c.ratio(),
            closed: c.is_closed(),
        }
    }
}

/// Complete analysis of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Whether a face was supplied
    pub face_detected: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_eye: Option<EyeReading>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_eye: Option<EyeReading>,

    /// Event for this frame
    pub event: Event,

    /// Drowsiness level after this frame
    pub level: DrowsinessLevel,

    /// Closed-frame counter after this frame
    pub closed_frames: u32,
}

impl FrameAnalysis {
    /// Analysis for a frame with no face
    pub fn no_face(level: DrowsinessLevel, closed_frames: u32) -> Self {
        Self {
            face_detected: false,
            left_eye: None,
            right_eye: None,
            event: Event::None,
            level,
            closed_frames,
        }
    }

    pub fn has_alarm(&self) -> bool {
        self.event.is_alarm()
    }
}
