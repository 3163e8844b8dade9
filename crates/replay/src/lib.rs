//! Landmark Recording Replay
//!
//! Feeds recorded face landmark frames (JSON lines) through a detection
//! session and reports the events the host would have shown.

use anyhow::Context;
use dms::{spawn_session, Event, FrameAnalysis, FrameResult, LandmarkSet, SleepDetector};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// One recorded frame: either a bare landmark array or every face the model reported
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FrameRecord {
    Faces { faces: Vec<LandmarkSet> },
    Single(LandmarkSet),
}

impl FrameRecord {
    pub fn into_faces(self) -> Vec<LandmarkSet> {
        match self {
            FrameRecord::Faces { faces } => faces,
            FrameRecord::Single(set) => vec![set],
        }
    }
}

/// Replay options
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Session queue capacity
    pub queue_capacity: usize,
    /// Print one status line per frame to stdout
    pub echo: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            echo: true,
        }
    }
}

/// Totals for a replay run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Frames submitted to the detector
    pub frames: u64,
    /// Lines that failed to parse
    pub malformed: u64,
    /// Frames rejected by the detector (landmark set too small)
    pub rejected: u64,
    /// Frames with no face
    pub no_face: u64,
    /// Frames with a face but degenerate eye geometry
    pub indeterminate: u64,
    pub eye_open: u64,
    pub eye_close: u64,
    pub sleep: u64,
    /// 1-based frame number of the first sleep event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_sleep_frame: Option<u64>,
}

impl ReplaySummary {
    fn record(&mut self, frame: u64, result: &FrameResult) {
        match result {
            Ok(analysis) if !analysis.face_detected => self.no_face += 1,
            Ok(analysis) => match analysis.event {
                Event::EyeOpen => self.eye_open += 1,
                Event::EyeClose => self.eye_close += 1,
                Event::Sleep => {
                    self.sleep += 1;
                    self.first_sleep_frame.get_or_insert(frame);
                }
                Event::None => self.indeterminate += 1,
            },
            Err(_) => self.rejected += 1,
        }
    }
}

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

fn status_line(frame: u64, analysis: &FrameAnalysis) -> String {
    let ratio = |r: Option<dms::EyeReading>| {
        r.and_then(|r| r.ratio)
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "{:>6}  {:<11}  L={:<6} R={:<6} closed_frames={}",
        frame,
        if analysis.face_detected { analysis.event.status() } else { "No face" },
        ratio(analysis.left_eye),
        ratio(analysis.right_eye),
        analysis.closed_frames,
    )
}

/// Replay every line of `input` through `detector`.
///
/// Returns the totals and the detector in its final state.
pub async fn run_replay<R>(
    input: R,
    detector: SleepDetector,
    options: &ReplayOptions,
) -> anyhow::Result<(ReplaySummary, SleepDetector)>
where
    R: AsyncBufRead + Unpin,
{
    let (session, mut results) = spawn_session(detector, options.queue_capacity);
    let handle = session.handle();

    let echo = options.echo;
    let consumer = tokio::spawn(async move {
        let mut summary = ReplaySummary::default();
        let mut frame = 0u64;
        while let Some(result) = results.recv().await {
            frame += 1;
            match &result {
                Ok(analysis) => {
                    if echo {
                        println!("{}", status_line(frame, analysis));
                    }
                    if analysis.has_alarm() && summary.first_sleep_frame.is_none() {
                        info!("Sleep detected at frame {}", frame);
                    }
                }
                Err(e) => warn!("Frame {} rejected: {}", frame, e),
            }
            summary.record(frame, &result);
        }
        summary
    });

    let mut lines = input.lines();
    let mut line_no = 0u64;
    let mut submitted = 0u64;
    let mut malformed = 0u64;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FrameRecord>(line) {
            Ok(record) => {
                handle.submit_faces(record.into_faces()).await?;
                submitted += 1;
            }
            Err(e) => {
                warn!("Line {}: malformed frame: {}", line_no, e);
                malformed += 1;
            }
        }
    }
    debug!("Input exhausted after {} lines", line_no);
    drop(handle);

    let detector = session.close().await?;
    let mut summary = consumer.await.context("Result consumer failed")?;
    summary.frames = submitted;
    summary.malformed = malformed;
    Ok((summary, detector))
}
