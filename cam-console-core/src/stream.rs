//! Video stream reader: connects to the MJPEG feed named by the current
//! target, watches the bytes for complete frames, and reports attempt
//! outcomes back to the engine.
//!
//! The reader never decides when to reconnect. It runs one attempt per
//! target, reports `Opened` on the first complete frame and `Failed` when
//! the attempt dies, then waits for the engine to publish the next target.
//! A target change mid-attempt drops the connection on the spot, which is
//! how a forced refresh or scheduled reload preempts a hung stream.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};

use cam_console_shared::CameraApi;

use crate::event::{Event, StreamSignal};

/// How often the reader logs the observed frame rate.
const FRAME_RATE_LOG_WINDOW: Duration = Duration::from_secs(10);

/// The stream URL the reader should be connected to, tagged with the
/// cache-busting token that names the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub url: String,
    pub t: u64,
}

/// Incremental detector of complete JPEG images in an MJPEG byte stream.
///
/// Counts start-of-image/end-of-image marker pairs without parsing the
/// multipart framing, so it works whatever the part boundary is and however
/// the transport slices the bytes. Markers split across chunk edges are
/// handled by carrying a trailing `0xFF`.
#[derive(Debug, Default)]
pub struct MjpegScanner {
    in_image: bool,
    pending_ff: bool,
    frames: u64,
}

impl MjpegScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total complete frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Scan one chunk; returns how many frames completed within it.
    pub fn feed(&mut self, chunk: &[u8]) -> u64 {
        let mut completed = 0;
        for &byte in chunk {
            if self.pending_ff {
                match byte {
                    0xD8 => {
                        self.in_image = true;
                        self.pending_ff = false;
                    }
                    0xD9 if self.in_image => {
                        self.in_image = false;
                        self.pending_ff = false;
                        completed += 1;
                    }
                    // Fill bytes: the marker is the last 0xFF of a run.
                    0xFF => {}
                    _ => self.pending_ff = false,
                }
                continue;
            }
            if byte == 0xFF {
                self.pending_ff = true;
            }
        }
        self.frames += completed;
        completed
    }
}

/// Drive video connection attempts until the target channel closes.
pub async fn run_stream_reader<A>(
    api: Arc<A>,
    mut targets: watch::Receiver<StreamTarget>,
    events: mpsc::UnboundedSender<Event>,
) where
    A: CameraApi + 'static,
{
    loop {
        let target = targets.borrow_and_update().clone();
        tokio::select! {
            changed = targets.changed() => {
                match changed {
                    // New target preempts the attempt we were about to start.
                    Ok(()) => continue,
                    Err(_) => return,
                }
            }
            _ = watch_attempt(api.as_ref(), &target, &events) => {
                if events
                    .send(Event::Stream(StreamSignal::Failed { t: target.t }))
                    .is_err()
                {
                    return;
                }
                // Sit out the backoff; the engine publishes the next target.
                if targets.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

/// One connection attempt: runs until the stream errors or ends.
async fn watch_attempt<A: CameraApi>(
    api: &A,
    target: &StreamTarget,
    events: &mpsc::UnboundedSender<Event>,
) {
    let mut stream = match api.open_video(target.t).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::debug!(t = target.t, error = %err, "video feed connect failed");
            return;
        }
    };

    let mut scanner = MjpegScanner::new();
    let mut opened = false;
    let mut window_start = Instant::now();
    let mut window_frames = 0u64;

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(t = target.t, error = %err, "video feed read failed");
                return;
            }
        };

        let completed = scanner.feed(&bytes);
        if completed > 0 && !opened {
            opened = true;
            if events
                .send(Event::Stream(StreamSignal::Opened { t: target.t }))
                .is_err()
            {
                return;
            }
        }

        window_frames += completed;
        let elapsed = window_start.elapsed();
        if elapsed >= FRAME_RATE_LOG_WINDOW {
            let fps = window_frames as f64 / elapsed.as_secs_f64();
            tracing::debug!(t = target.t, fps, "stream frame rate");
            window_start = Instant::now();
            window_frames = 0;
        }
    }

    tracing::debug!(t = target.t, frames = scanner.frames(), "video feed ended");
}
