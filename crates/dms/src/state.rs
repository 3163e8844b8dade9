//! Drowsiness state tracking

use serde::{Deserialize, Serialize};
use crate::analysis::Event;
use crate::ear::FrameSignal;

/// Consecutive closed frames before the subject counts as asleep
pub const THRESHOLD_FRAMES: u32 = 30;

/// Drowsiness level, derived from the closed-frame counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrowsinessLevel {
    /// Counter at zero
    #[default]
    Awake,
    /// Eyes closed, but for fewer frames than the threshold
    BlinkingOrDrowsy,
    /// Counter at the threshold
    Asleep,
}

/// Per-session drowsiness state (tracked over frames)
///
/// The closed-frame counter is the only stored field; it saturates at
/// `threshold_frames` and drops to zero on the first open frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredState")]
pub struct DrowsinessState {
    consecutive_closed_frames: u32,
    threshold_frames: u32,
}

/// Unchecked wire form, validated on the way in
#[derive(Deserialize)]
struct StoredState {
    consecutive_closed_frames: u32,
    threshold_frames: u32,
}

impl TryFrom<StoredState> for DrowsinessState {
    type Error = String;

    fn try_from(stored: StoredState) -> Result<Self, Self::Error> {
        if stored.threshold_frames == 0 {
            return Err("threshold_frames must be at least 1".to_string());
        }
        if stored.consecutive_closed_frames > stored.threshold_frames {
            return Err(format!(
                "consecutive_closed_frames {} exceeds threshold_frames {}",
                stored.consecutive_closed_frames, stored.threshold_frames
            ));
        }
        Ok(Self {
            consecutive_closed_frames: stored.consecutive_closed_frames,
            threshold_frames: stored.threshold_frames,
        })
    }
}

impl Default for DrowsinessState {
    fn default() -> Self {
        Self::new(THRESHOLD_FRAMES)
    }
}

impl DrowsinessState {
    /// Create a state with a custom threshold (clamped to at least 1)
    pub fn new(threshold_frames: u32) -> Self {
        Self {
            consecutive_closed_frames: 0,
            threshold_frames: threshold_frames.max(1),
        }
    }

    pub fn consecutive_closed_frames(&self) -> u32 {
        self.consecutive_closed_frames
    }

    pub fn threshold_frames(&self) -> u32 {
        self.threshold_frames
    }

    pub fn level(&self) -> DrowsinessLevel {
        match self.consecutive_closed_frames {
            0 => DrowsinessLevel::Awake,
            n if n >= self.threshold_frames => DrowsinessLevel::Asleep,
            _ => DrowsinessLevel::BlinkingOrDrowsy,
        }
    }

    /// Advance on a determinate frame
    pub fn update(&mut self, both_closed: bool) -> Event {
        if both_closed {
            self.consecutive_closed_frames = self
                .consecutive_closed_frames
                .saturating_add(1)
                .min(self.threshold_frames);

            if self.consecutive_closed_frames == self.threshold_frames {
                Event::Sleep
            } else {
                Event::EyeClose
            }
        } else {
            self.consecutive_closed_frames = 0;
            Event::EyeOpen
        }
    }

    /// Advance on any frame signal; indeterminate frames leave the counter untouched
    pub fn apply(&mut self, signal: FrameSignal) -> Event {
        match signal {
            FrameSignal::Determinate { both_closed } => self.update(both_closed),
            FrameSignal::Indeterminate => Event::None,
        }
    }

    /// Reset state (on subject change)
    pub fn reset(&mut self) {
        self.consecutive_closed_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_saturates() {
        let mut state = DrowsinessState::default();
        for n in 1..=100u32 {
            state.update(true);
            assert_eq!(state.consecutive_closed_frames(), n.min(THRESHOLD_FRAMES));
        }
        assert_eq!(state.level(), DrowsinessLevel::Asleep);
    }

    #[test]
    fn test_sleep_is_level_triggered() {
        let mut state = DrowsinessState::default();
        for _ in 0..29 {
            assert_eq!(state.update(true), Event::EyeClose);
        }
        assert_eq!(state.level(), DrowsinessLevel::BlinkingOrDrowsy);
        assert_eq!(state.update(true), Event::Sleep);
        assert_eq!(state.update(true), Event::Sleep);
        assert_eq!(state.update(true), Event::Sleep);
    }

    #[test]
    fn test_open_resets_from_asleep() {
        let mut state = DrowsinessState::default();
        for _ in 0..45 {
            state.update(true);
        }
        assert_eq!(state.update(false), Event::EyeOpen);
        assert_eq!(state.consecutive_closed_frames(), 0);
        assert_eq!(state.level(), DrowsinessLevel::Awake);
        assert_eq!(state.update(false), Event::EyeOpen);
    }

    #[test]
    fn test_indeterminate_is_transparent() {
        let mut state = DrowsinessState::default();
        for _ in 0..29 {
            state.apply(FrameSignal::Determinate { both_closed: true });
        }
        assert_eq!(state.apply(FrameSignal::Indeterminate), Event::None);
        assert_eq!(state.consecutive_closed_frames(), 29);
        assert_eq!(state.apply(FrameSignal::Determinate { both_closed: true }), Event::Sleep);
    }

    #[test]
    fn test_threshold_of_one() {
        let mut state = DrowsinessState::new(1);
        assert_eq!(state.update(true), Event::Sleep);
        assert_eq!(state.level(), DrowsinessLevel::Asleep);

        // Zero is clamped so the cap stays reachable
        let mut state = DrowsinessState::new(0);
        assert_eq!(state.threshold_frames(), 1);
        assert_eq!(state.update(true), Event::Sleep);
    }

    #[test]
    fn test_deserialize_validates_counter() {
        let state: DrowsinessState =
            serde_json::from_str(r#"{"consecutive_closed_frames":12,"threshold_frames":30}"#)
                .unwrap();
        assert_eq!(state.consecutive_closed_frames(), 12);
        assert_eq!(state.level(), DrowsinessLevel::BlinkingOrDrowsy);

        let over_cap = r#"{"consecutive_closed_frames":99,"threshold_frames":30}"#;
        assert!(serde_json::from_str::<DrowsinessState>(over_cap).is_err());

        let zero_cap = r#"{"consecutive_closed_frames":0,"threshold_frames":0}"#;
        assert!(serde_json::from_str::<DrowsinessState>(zero_cap).is_err());
    }

    #[test]
    fn test_serialize_roundtrip_at_cap() {
        let mut state = DrowsinessState::new(3);
        for _ in 0..5 {
            state.update(true);
        }
        let json = serde_json::to_string(&state).unwrap();
        let restored: DrowsinessState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.level(), DrowsinessLevel::Asleep);
    }

    #[test]
    fn test_levels() {
        let mut state = DrowsinessState::new(3);
        assert_eq!(state.level(), DrowsinessLevel::Awake);
        state.update(true);
        assert_eq!(state.level(), DrowsinessLevel::BlinkingOrDrowsy);
        state.update(true);
        state.update(true);
        assert_eq!(state.level(), DrowsinessLevel::Asleep);
        state.reset();
        assert_eq!(state.level(), DrowsinessLevel::Awake);
    }
}
