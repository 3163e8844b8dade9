//! Single-owner detection session
//!
//! Moves a [`SleepDetector`] into a tokio task that processes frames one at
//! a time in arrival order. Producers on any thread submit frames through a
//! cloneable [`SessionHandle`]; results come back on a receiver.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::analysis::FrameAnalysis;
use crate::detector::SleepDetector;
use crate::landmark::LandmarkSet;
use crate::DmsError;

/// Result of processing one submitted frame
pub type FrameResult = Result<FrameAnalysis, DmsError>;

/// Frames reported by the upstream model: zero or more faces
type FacesFrame = Vec<LandmarkSet>;

/// Producer side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    frames: mpsc::Sender<FacesFrame>,
}

/// Owner of the session task, used to shut it down
#[derive(Debug)]
pub struct SessionTask {
    handle: SessionHandle,
    task: JoinHandle<SleepDetector>,
    closing: Arc<Notify>,
}

/// Spawn a session task on the current tokio runtime.
///
/// `capacity` bounds both the frame queue and the result queue.
pub fn spawn_session(
    detector: SleepDetector,
    capacity: usize,
) -> (SessionTask, mpsc::Receiver<FrameResult>) {
    let capacity = capacity.max(1);
    let (frame_tx, mut frame_rx) = mpsc::channel::<FacesFrame>(capacity);
    let (result_tx, result_rx) = mpsc::channel::<FrameResult>(capacity);

    let closing = Arc::new(Notify::new());
    let shutdown = Arc::clone(&closing);

    let task = tokio::spawn(async move {
        let mut detector = detector;
        let mut processed: u64 = 0;
        let mut dropped: u64 = 0;
        let mut draining = false;

        info!("Detection session started");
        while let Some(faces) = frame_rx.recv().await {
            processed += 1;
            let result = detector.process_faces(&faces);
            if let Err(e) = &result {
                warn!("Frame {} skipped: {}", processed, e);
            }

            // Once closing, a full result queue must not stall the drain
            if draining {
                match result_tx.try_send(result) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => dropped += 1,
                    Err(TrySendError::Closed(_)) => break,
                }
                continue;
            }

            tokio::select! {
                biased;
                sent = result_tx.send(result) => {
                    if sent.is_err() {
                        debug!("Result receiver dropped, stopping session");
                        break;
                    }
                }
                _ = shutdown.notified() => {
                    draining = true;
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!("Dropped {} results while closing with a full result queue", dropped);
        }
        info!("Detection session ended after {} frames", processed);
        detector
    });

    let handle = SessionHandle { frames: frame_tx };
    (SessionTask { handle, task, closing }, result_rx)
}

impl SessionHandle {
    /// Submit one face's landmarks
    pub async fn submit(&self, landmarks: LandmarkSet) -> Result<(), DmsError> {
        self.submit_faces(vec![landmarks]).await
    }

    /// Submit every face reported for one frame
    pub async fn submit_faces(&self, faces: Vec<LandmarkSet>) -> Result<(), DmsError> {
        self.frames.send(faces).await.map_err(|_| DmsError::SessionClosed)
    }

    /// Submit from a non-async thread (e.g. a camera callback).
    ///
    /// Blocks while the queue is full. Must not be called from async code.
    pub fn submit_blocking(&self, faces: Vec<LandmarkSet>) -> Result<(), DmsError> {
        self.frames.blocking_send(faces).map_err(|_| DmsError::SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

impl SessionTask {
    /// A new producer handle for this session
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop accepting frames and wait for the queue to drain.
    ///
    /// Every queued frame still updates the detector. Results that do not
    /// fit in the result queue are dropped once closing starts, so an
    /// undrained receiver cannot stall shutdown. Returns the detector so its
    /// state can be inspected or reused. Other live handles keep the session
    /// open until they are dropped.
    pub async fn close(self) -> Result<SleepDetector, DmsError> {
        drop(self.handle);
        self.closing.notify_one();
        self.task.await.map_err(|e| DmsError::Session(e.to_string()))
    }
}
