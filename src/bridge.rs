//! Async capture bridge
//!
//! Turns the device's "frame available" signal into an awaitable frame
//! source. The previous buffer is released before waiting so the producer
//! can refill it, then the task yields to the runtime each turn until a
//! frame is ready. Nothing here blocks the thread, so other connections on
//! a single-threaded runtime keep running while a stream waits.

use crate::camera::{Camera, CameraError, DriverError, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Where the bridge is in its acquire cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    AwaitingFrame,
    Ready,
}

pub struct FrameBridge {
    camera: Arc<Camera>,
    state: BridgeState,
    timeout: Duration,
    polls: u64,
}

impl FrameBridge {
    /// `timeout` bounds a single acquire
    pub fn new(camera: Arc<Camera>, timeout: Duration) -> Self {
        Self {
            camera,
            state: BridgeState::Idle,
            timeout,
            polls: 0,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Scheduling turns spent waiting, over the bridge's lifetime
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Releases the previous frame and waits for the next one.
    ///
    /// The returned frame must be consumed before the next call; the call
    /// hands its buffer back to the driver. Fails with
    /// `CameraError::NotInitialized` if the device goes down while waiting,
    /// and with a driver timeout if no frame shows up within the timeout.
    pub async fn acquire(&mut self) -> Result<Frame, CameraError> {
        self.state = BridgeState::AwaitingFrame;
        self.camera.release();
        let deadline = Instant::now() + self.timeout;

        let result = loop {
            if !self.camera.is_initialized() {
                break Err(CameraError::NotInitialized);
            }

            if self.camera.frame_available() {
                self.state = BridgeState::Ready;
                match self.camera.capture() {
                    Ok(Some(frame)) => break Ok(frame),
                    // Taken between the check and the capture; keep waiting
                    Ok(None) => self.state = BridgeState::AwaitingFrame,
                    Err(e) => break Err(e),
                }
            }

            if Instant::now() >= deadline {
                break Err(CameraError::Driver(DriverError::Timeout));
            }

            self.polls += 1;
            tokio::task::yield_now().await;
        };

        self.state = BridgeState::Idle;
        if let Ok(frame) = &result {
            trace!(bytes = frame.len(), format = %frame.format, "Frame acquired");
        }
        result
    }
}
