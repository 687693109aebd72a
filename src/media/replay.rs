use image::{RgbImage, imageops::FilterType};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

use super::source_utils::collect_images_from_dir;
use super::{CameraDevice, CameraStream, Facing, ReadyState};
use crate::error::{AppError, Result};
use crate::prediction::Size;

/// Camera that replays a directory of image files as a live stream.
///
/// `user` and `environment` facings may point at different directories;
/// when only one is configured it serves both.
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    user_dir: PathBuf,
    environment_dir: Option<PathBuf>,
    looping: bool,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: dir.into(),
            environment_dir: None,
            looping: true,
        }
    }

    pub fn with_environment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.environment_dir = Some(dir.into());
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn dir_for(&self, facing: Facing) -> &Path {
        match (facing, &self.environment_dir) {
            (Facing::Environment, Some(dir)) => dir,
            _ => &self.user_dir,
        }
    }
}

impl CameraDevice for ReplayCamera {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>> {
        let dir = self.dir_for(facing);
        let frames = collect_images_from_dir(dir).map_err(|e| match e {
            AppError::Io(io) if io.kind() == ErrorKind::PermissionDenied => {
                AppError::PermissionDenied(format!("{:?}: {}", dir, io))
            }
            other => AppError::DeviceUnavailable(format!("{:?}: {}", dir, other)),
        })?;

        if frames.is_empty() {
            return Err(AppError::DeviceUnavailable(format!(
                "no image frames in {:?}",
                dir
            )));
        }

        tracing::info!(
            "Replay camera ({}) opened: {} frames from {:?}",
            facing,
            frames.len(),
            dir
        );

        let decoder = FrameDecoder {
            frames,
            next_idx: 0,
            looping: self.looping,
            size: None,
        };
        let stop = Arc::new(AtomicBool::new(false));
        let (open_tx, open_rx) = mpsc::sync_channel::<Option<(Size, RgbImage)>>(1);
        let (frame_tx, frame_rx) = mpsc::sync_channel::<RgbImage>(1);

        let thread_stop = Arc::clone(&stop);
        thread::spawn(move || prefetch_loop(decoder, &thread_stop, open_tx, frame_tx));

        let Ok(Some((size, first))) = open_rx.recv() else {
            return Err(AppError::DeviceUnavailable(format!(
                "no decodable frames in {:?}",
                dir
            )));
        };

        Ok(Box::new(ReplayStream {
            size,
            frames: Some(frame_rx),
            pending: Some(first),
            last: None,
            ended: false,
            stopped: false,
            stop,
        }))
    }
}

struct FrameDecoder {
    frames: Vec<PathBuf>,
    next_idx: usize,
    looping: bool,
    size: Option<Size>,
}

impl FrameDecoder {
    /// Decode the next readable frame, wrapping around when looping
    fn next_frame(&mut self) -> Option<RgbImage> {
        let total = self.frames.len();
        for _ in 0..total {
            if self.next_idx >= total {
                if !self.looping {
                    return None;
                }
                self.next_idx = 0;
            }

            let path = &self.frames[self.next_idx];
            self.next_idx += 1;

            match image::open(path) {
                Ok(img) => {
                    let img = img.to_rgb8();
                    let size = *self.size.get_or_insert(img.dimensions().into());
                    // A camera never changes resolution mid-stream
                    if img.dimensions() != (size.width, size.height) {
                        return Some(image::imageops::resize(
                            &img,
                            size.width,
                            size.height,
                            FilterType::Triangle,
                        ));
                    }
                    return Some(img);
                }
                Err(e) => {
                    tracing::error!("Failed to open frame: {:?}. Error: {}", path, e);
                }
            }
        }
        None
    }
}

/// Decode frames one ahead of the reader until stopped or out of frames
fn prefetch_loop(
    mut decoder: FrameDecoder,
    stop: &AtomicBool,
    open_tx: mpsc::SyncSender<Option<(Size, RgbImage)>>,
    frame_tx: mpsc::SyncSender<RgbImage>,
) {
    let first = decoder
        .next_frame()
        .and_then(|img| decoder.size.map(|size| (size, img)));
    let opened = first.is_some();
    if open_tx.send(first).is_err() || !opened {
        return;
    }

    while !stop.load(Ordering::Acquire) {
        let Some(img) = decoder.next_frame() else {
            tracing::debug!("Replay ran out of frames");
            break;
        };
        // blocks until the reader takes the previous frame; fails once it is gone
        if frame_tx.send(img).is_err() {
            break;
        }
    }
}

struct ReplayStream {
    size: Size,
    frames: Option<mpsc::Receiver<RgbImage>>,
    pending: Option<RgbImage>,
    last: Option<RgbImage>,
    ended: bool,
    stopped: bool,
    stop: Arc<AtomicBool>,
}

impl ReplayStream {
    fn poll_prefetched(&mut self) {
        let Some(frames) = &self.frames else {
            self.ended = true;
            return;
        };
        match frames.try_recv() {
            Ok(img) => self.pending = Some(img),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.frames = None;
                self.ended = true;
            }
        }
    }
}

impl CameraStream for ReplayStream {
    fn ready_state(&self) -> ReadyState {
        if self.stopped {
            ReadyState::HaveNothing
        } else if self.pending.is_some() || self.last.is_some() {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveMetadata
        }
    }

    fn native_size(&self) -> Option<Size> {
        Some(self.size)
    }

    /// The next prefetched frame, or the previous one again while the
    /// decoder has not caught up.
    fn latest_frame(&mut self) -> Option<RgbImage> {
        if self.stopped {
            return None;
        }
        if self.pending.is_none() {
            self.poll_prefetched();
        }
        if let Some(img) = self.pending.take() {
            self.last = Some(img.clone());
            return Some(img);
        }
        if self.ended {
            self.last = None;
        }
        self.last.clone()
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.stop.store(true, Ordering::Release);
        // dropping the receiver wakes a decoder blocked on send
        self.frames = None;
        self.pending = None;
        self.last = None;
    }
}
