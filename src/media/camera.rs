use std::sync::Arc;

use super::{CameraStream, Facing, Frame, FrameStatus, ReadyState};
use crate::prediction::Size;

/// Owned camera stream; stops the hardware on `deactivate` or drop.
pub struct CameraHandle {
    stream: Box<dyn CameraStream>,
    facing: Facing,
    stopped: bool,
    frame_idx: u64,
}

impl CameraHandle {
    pub fn new(stream: Box<dyn CameraStream>, facing: Facing) -> Self {
        Self {
            stream,
            facing,
            stopped: false,
            frame_idx: 0,
        }
    }

    pub const fn facing(&self) -> Facing {
        self.facing
    }

    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn native_size(&self) -> Option<Size> {
        if self.stopped {
            return None;
        }
        self.stream.native_size()
    }

    /// Sample a frame if the stream reached `min_ready`.
    pub fn frame(&mut self, min_ready: ReadyState) -> FrameStatus {
        if self.stopped {
            return FrameStatus::Inactive;
        }

        let state = self.stream.ready_state();
        if state < min_ready {
            return FrameStatus::NotReady(state);
        }

        match self.stream.latest_frame() {
            Some(image) => {
                let frame = Frame::new(Arc::new(image), self.frame_idx);
                self.frame_idx += 1;
                FrameStatus::Ready(frame)
            }
            None => FrameStatus::NotReady(state),
        }
    }

    /// Stop every track; idempotent.
    pub fn deactivate(&mut self) {
        if self.stopped {
            return;
        }
        self.stream.stop();
        self.stopped = true;
        tracing::debug!("Camera stream ({}) stopped", self.facing);
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("facing", &self.facing)
            .field("stopped", &self.stopped)
            .field("frame_idx", &self.frame_idx)
            .finish()
    }
}
