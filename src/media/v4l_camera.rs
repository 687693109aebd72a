use image::{ImageFormat, RgbImage};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream as _;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use super::{CameraDevice, CameraStream, Facing, ReadyState};
use crate::error::{AppError, Result};
use crate::prediction::Size;

const BUFFER_COUNT: u32 = 4;

/// Video4Linux camera; `user` and `environment` map to device paths.
#[derive(Debug, Clone)]
pub struct V4lCamera {
    user_device: String,
    environment_device: Option<String>,
}

impl V4lCamera {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            user_device: device.into(),
            environment_device: None,
        }
    }

    pub fn with_environment_device(mut self, device: impl Into<String>) -> Self {
        self.environment_device = Some(device.into());
        self
    }
}

fn map_open_error(device: &str, err: std::io::Error) -> AppError {
    match err.kind() {
        ErrorKind::PermissionDenied => AppError::PermissionDenied(format!("{device}: {err}")),
        _ => AppError::DeviceUnavailable(format!("{device}: {err}")),
    }
}

impl CameraDevice for V4lCamera {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>> {
        let device = match (facing, &self.environment_device) {
            (Facing::Environment, Some(dev)) => dev.clone(),
            _ => self.user_device.clone(),
        };

        let shared = Arc::new(Shared::default());
        let (open_tx, open_rx) = mpsc::sync_channel::<std::result::Result<Size, AppError>>(1);

        let thread_shared = Arc::clone(&shared);
        let thread_device = device.clone();
        let worker = thread::spawn(move || capture_loop(&thread_device, &thread_shared, open_tx));

        let size = match open_rx.recv() {
            Ok(Ok(size)) => size,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(AppError::DeviceUnavailable(format!(
                    "{device}: capture thread exited"
                )));
            }
        };

        tracing::info!("V4L camera ({}) opened: {} at {}", facing, device, size);

        Ok(Box::new(V4lStream {
            shared,
            size,
            worker: Some(worker),
        }))
    }
}

#[derive(Default)]
struct Shared {
    latest: Mutex<Option<RgbImage>>,
    ready: AtomicU8,
    stop: AtomicBool,
}

fn capture_loop(
    device: &str,
    shared: &Shared,
    open_tx: mpsc::SyncSender<std::result::Result<Size, AppError>>,
) {
    let setup = || -> std::io::Result<(Device, FourCC, Size)> {
        let dev = Device::with_path(device)?;
        let mut fmt = dev.format()?;
        fmt.fourcc = FourCC::new(b"MJPG");
        let fmt = dev.set_format(&fmt)?;
        Ok((dev, fmt.fourcc, Size::new(fmt.width, fmt.height)))
    };

    let (dev, fourcc, size) = match setup() {
        Ok(v) => v,
        Err(e) => {
            let _ = open_tx.send(Err(map_open_error(device, e)));
            return;
        }
    };

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(s) => s,
        Err(e) => {
            let _ = open_tx.send(Err(map_open_error(device, e)));
            return;
        }
    };

    shared
        .ready
        .store(ReadyState::HaveMetadata as u8, Ordering::Release);
    if open_tx.send(Ok(size)).is_err() {
        return;
    }

    while !shared.stop.load(Ordering::Acquire) {
        let data = match stream.next() {
            Ok((buf, _meta)) => buf.to_vec(),
            Err(e) => {
                tracing::error!("Failed to capture frame from {}: {}", device, e);
                break;
            }
        };

        match decode_frame(&data, &fourcc, size) {
            Some(img) => {
                *shared.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(img);
                shared
                    .ready
                    .store(ReadyState::HaveEnoughData as u8, Ordering::Release);
            }
            None => tracing::warn!("Dropping undecodable {} frame", fourcc),
        }
    }
}

fn decode_frame(data: &[u8], fourcc: &FourCC, size: Size) -> Option<RgbImage> {
    match &fourcc.repr {
        b"MJPG" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .ok()
            .map(|img| img.to_rgb8()),
        b"YUYV" => yuyv_to_rgb(data, size),
        b"RGB3" => RgbImage::from_raw(size.width, size.height, data.to_vec()),
        _ => None,
    }
}

fn yuyv_to_rgb(data: &[u8], size: Size) -> Option<RgbImage> {
    let pixels = (size.width * size.height) as usize;
    if data.len() < pixels * 2 {
        return None;
    }

    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (
            f32::from(chunk[0]),
            f32::from(chunk[1]) - 128.0,
            f32::from(chunk[2]),
            f32::from(chunk[3]) - 128.0,
        );
        for y in [y0, y1] {
            rgb.push(clamp(y + 1.402 * v));
            rgb.push(clamp(y - 0.344 * u - 0.714 * v));
            rgb.push(clamp(y + 1.772 * u));
        }
    }
    RgbImage::from_raw(size.width, size.height, rgb)
}

struct V4lStream {
    shared: Arc<Shared>,
    size: Size,
    worker: Option<JoinHandle<()>>,
}

impl CameraStream for V4lStream {
    fn ready_state(&self) -> ReadyState {
        if self.worker.is_none() {
            return ReadyState::HaveNothing;
        }
        match self.shared.ready.load(Ordering::Acquire) {
            x if x >= ReadyState::HaveEnoughData as u8 => ReadyState::HaveEnoughData,
            x if x >= ReadyState::HaveMetadata as u8 => ReadyState::HaveMetadata,
            _ => ReadyState::HaveNothing,
        }
    }

    fn native_size(&self) -> Option<Size> {
        Some(self.size)
    }

    fn latest_frame(&mut self) -> Option<RgbImage> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("V4L capture thread panicked");
            }
        }
    }
}
