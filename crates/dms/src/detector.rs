//! Per-session sleep detector

use tracing::{debug, info, warn};
use crate::analysis::{Event, EyeReading, FrameAnalysis};
use crate::ear::{classify_eye, FrameSignal};
use crate::landmark::LandmarkSet;
use crate::state::{DrowsinessLevel, DrowsinessState};
use crate::{DmsConfig, DmsError};

/// Sleep detector owning one session's drowsiness state.
///
/// Create one per detection session and feed it frames in arrival order.
/// Independent detectors share nothing.
#[derive(Debug, Clone)]
pub struct SleepDetector {
    config: DmsConfig,
    state: DrowsinessState,
}

impl Default for SleepDetector {
    fn default() -> Self {
        Self {
            state: DrowsinessState::default(),
            config: DmsConfig::default(),
        }
    }
}

impl SleepDetector {
    /// Create a detector with validated configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "Creating sleep detector: min_ratio={} threshold_frames={}",
            config.min_ratio, config.threshold_frames
        );
        Ok(Self {
            state: DrowsinessState::new(config.threshold_frames),
            config,
        })
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn state(&self) -> &DrowsinessState {
        &self.state
    }

    pub fn closed_frames(&self) -> u32 {
        self.state.consecutive_closed_frames()
    }

    pub fn level(&self) -> DrowsinessLevel {
        self.state.level()
    }

    /// Process one face's landmarks and return the frame event
    pub fn process_frame(&mut self, landmarks: &LandmarkSet) -> Result<Event, DmsError> {
        self.analyze(landmarks).map(|a| a.event)
    }

    /// Process the faces reported for one frame; only the first face is used
    pub fn process_faces(&mut self, faces: &[LandmarkSet]) -> Result<FrameAnalysis, DmsError> {
        match faces.first() {
            Some(face) => self.analyze(face),
            None => {
                debug!("No face in frame, skipping");
                Ok(FrameAnalysis::no_face(self.level(), self.closed_frames()))
            }
        }
    }

    /// Analyze one face's landmarks and update state
    pub fn analyze(&mut self, landmarks: &LandmarkSet) -> Result<FrameAnalysis, DmsError> {
        let (left_quad, right_quad) = self.config.topology.extract(landmarks)?;

        let left = classify_eye(&left_quad, self.config.min_ratio);
        let right = classify_eye(&right_quad, self.config.min_ratio);
        let signal = FrameSignal::combine(left, right);

        let previous = self.level();
        let event = self.state.apply(signal);
        let level = self.level();

        match signal {
            FrameSignal::Determinate { both_closed } => {
                debug!("Both eyes closed: {} (count: {})", both_closed, self.closed_frames());
            }
            FrameSignal::Indeterminate => {
                debug!("Indeterminate eye geometry, frame skipped");
            }
        }
        if level == DrowsinessLevel::Asleep && previous != DrowsinessLevel::Asleep {
            warn!("Eyes closed for {} consecutive frames, subject asleep", self.closed_frames());
        } else if previous == DrowsinessLevel::Asleep && level == DrowsinessLevel::Awake {
            info!("Eyes reopened after sleep");
        }

        Ok(FrameAnalysis {
            face_detected: true,
            left_eye: Some(EyeReading::from(left)),
            right_eye: Some(EyeReading::from(right)),
            event,
            level,
            closed_frames: self.closed_frames(),
        })
    }

    /// Reset drowsiness state (on subject change)
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{EyeIndices, FaceTopology, Landmark};

    fn place_eye(
        set: &mut LandmarkSet,
        eye: &EyeIndices,
        cx: f32,
        half_width: f32,
        half_open: f32,
    ) {
        set.set(eye.outer, Landmark::new(cx - half_width, 0.5));
        set.set(eye.inner, Landmark::new(cx + half_width, 0.5));
        set.set(eye.upper, Landmark::new(cx, 0.5 - half_open));
        set.set(eye.lower, Landmark::new(cx, 0.5 + half_open));
    }

    fn face(left_open: f32, right_open: f32) -> LandmarkSet {
        let topo = FaceTopology::FACE_MESH;
        let mut set = LandmarkSet::new(vec![Landmark::default(); 468]);
        place_eye(&mut set, &topo.left, 0.35, 0.05, left_open);
        place_eye(&mut set, &topo.right, 0.65, 0.05, right_open);
        set
    }

    fn closed_face() -> LandmarkSet {
        face(0.005, 0.005)
    }

    fn open_face() -> LandmarkSet {
        face(0.015, 0.015)
    }

    fn degenerate_face() -> LandmarkSet {
        let mut set = closed_face();
        let left = FaceTopology::FACE_MESH.left;
        let corner = set.point(left.outer).unwrap();
        set.set(left.inner, corner);
        set
    }

    #[test]
    fn test_open_and_closed_frames() {
        let mut detector = SleepDetector::default();
        assert_eq!(detector.process_frame(&open_face()).unwrap(), Event::EyeOpen);
        assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::EyeClose);
        assert_eq!(detector.closed_frames(), 1);
        assert_eq!(detector.process_frame(&open_face()).unwrap(), Event::EyeOpen);
        assert_eq!(detector.closed_frames(), 0);
    }

    #[test]
    fn test_one_eye_closed_is_open() {
        let mut detector = SleepDetector::default();
        assert_eq!(detector.process_frame(&face(0.005, 0.015)).unwrap(), Event::EyeOpen);
        assert_eq!(detector.process_frame(&face(0.015, 0.005)).unwrap(), Event::EyeOpen);
    }

    #[test]
    fn test_sleep_after_thirty_frames() {
        let mut detector = SleepDetector::default();
        for _ in 0..29 {
            assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::EyeClose);
        }
        assert_eq!(detector.level(), DrowsinessLevel::BlinkingOrDrowsy);
        assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::Sleep);
        assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::Sleep);
        assert_eq!(detector.closed_frames(), 30);
        assert_eq!(detector.level(), DrowsinessLevel::Asleep);

        assert_eq!(detector.process_frame(&open_face()).unwrap(), Event::EyeOpen);
        assert_eq!(detector.level(), DrowsinessLevel::Awake);
    }

    #[test]
    fn test_degenerate_frame_skipped() {
        let mut detector = SleepDetector::default();
        for _ in 0..29 {
            detector.process_frame(&closed_face()).unwrap();
        }

        let analysis = detector.analyze(&degenerate_face()).unwrap();
        assert_eq!(analysis.event, Event::None);
        assert_eq!(analysis.closed_frames, 29);
        assert_eq!(analysis.left_eye.unwrap().ratio, None);
        assert!(analysis.right_eye.unwrap().ratio.is_some());

        assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::Sleep);
    }

    #[test]
    fn test_short_landmark_set_keeps_state() {
        let mut detector = SleepDetector::default();
        for _ in 0..5 {
            detector.process_frame(&closed_face()).unwrap();
        }
        let short = LandmarkSet::new(vec![Landmark::default(); 100]);
        assert!(matches!(
            detector.process_frame(&short),
            Err(DmsError::OutOfRange { len: 100, .. })
        ));
        assert_eq!(detector.closed_frames(), 5);
    }

    #[test]
    fn test_process_faces_uses_first_face() {
        let mut detector = SleepDetector::default();
        detector.process_frame(&closed_face()).unwrap();

        let none = detector.process_faces(&[]).unwrap();
        assert!(!none.face_detected);
        assert_eq!(none.event, Event::None);
        assert_eq!(none.closed_frames, 1);

        let analysis = detector.process_faces(&[closed_face(), open_face()]).unwrap();
        assert!(analysis.face_detected);
        assert_eq!(analysis.event, Event::EyeClose);
        assert_eq!(analysis.closed_frames, 2);
    }

    #[test]
    fn test_custom_config() {
        let config = DmsConfig {
            threshold_frames: 3,
            ..Default::default()
        };
        let mut detector = SleepDetector::new(config).unwrap();
        detector.process_frame(&closed_face()).unwrap();
        detector.process_frame(&closed_face()).unwrap();
        assert_eq!(detector.process_frame(&closed_face()).unwrap(), Event::Sleep);

        // Open eye (ratio 0.3) counts as closed under a higher threshold
        let config = DmsConfig {
            min_ratio: 0.35,
            ..Default::default()
        };
        let mut detector = SleepDetector::new(config).unwrap();
        assert_eq!(detector.process_frame(&open_face()).unwrap(), Event::EyeClose);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DmsConfig {
            threshold_frames: 0,
            ..Default::default()
        };
        assert!(SleepDetector::new(config).is_err());
    }

    #[test]
    fn test_independent_sessions() {
        let mut a = SleepDetector::default();
        let mut b = SleepDetector::default();
        for _ in 0..10 {
            a.process_frame(&closed_face()).unwrap();
        }
        b.process_frame(&open_face()).unwrap();
        assert_eq!(a.closed_frames(), 10);
        assert_eq!(b.closed_frames(), 0);

        a.reset();
        assert_eq!(a.closed_frames(), 0);
    }
}
