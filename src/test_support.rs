//! Fakes shared by the unit tests: a counting camera, a scripted model
//! backend and a recording result sink.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

use crate::backend::{ModelBackend, RawModelOutput};
use crate::catalog::ModelId;
use crate::error::{AppError, Result};
use crate::infer_loop::{LoopState, SessionToken};
use crate::media::{CameraDevice, CameraStream, Facing, Frame, ReadyState};
use crate::prediction::Size;
use crate::sink::{Notice, ResultSink, ResultUpdate};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

// -- camera

#[derive(Debug)]
pub struct CameraCounters {
    opened: AtomicUsize,
    stopped: AtomicUsize,
    active: AtomicUsize,
    ready: Mutex<ReadyState>,
}

impl CameraCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, state: ReadyState) {
        *self.ready.lock().unwrap() = state;
    }
}

/// Camera producing solid frames that counts every open and stop
pub struct CountingCamera {
    counters: Arc<CameraCounters>,
    size: Size,
    deny: bool,
}

impl Default for CountingCamera {
    fn default() -> Self {
        Self {
            counters: Arc::new(CameraCounters {
                opened: AtomicUsize::new(0),
                stopped: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                ready: Mutex::new(ReadyState::HaveEnoughData),
            }),
            size: Size::new(64, 48),
            deny: false,
        }
    }
}

impl CountingCamera {
    pub fn counters(&self) -> Arc<CameraCounters> {
        Arc::clone(&self.counters)
    }

    pub fn deny_permission(mut self) -> Self {
        self.deny = true;
        self
    }

    pub fn with_ready_state(self, state: ReadyState) -> Self {
        self.counters.set_ready(state);
        self
    }
}

impl CameraDevice for CountingCamera {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>> {
        if self.deny {
            return Err(AppError::PermissionDenied(format!("{facing} camera")));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingStream {
            counters: Arc::clone(&self.counters),
            size: self.size,
            stopped: false,
        }))
    }
}

struct CountingStream {
    counters: Arc<CameraCounters>,
    size: Size,
    stopped: bool,
}

impl CameraStream for CountingStream {
    fn ready_state(&self) -> ReadyState {
        *self.counters.ready.lock().unwrap()
    }

    fn native_size(&self) -> Option<Size> {
        Some(self.size)
    }

    fn latest_frame(&mut self) -> Option<RgbImage> {
        Some(RgbImage::from_pixel(self.size.width, self.size.height, Rgb([90, 90, 90])))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// -- backend

/// Backend returning queued results, then a fixed default output
pub struct ScriptedBackend {
    default_output: RawModelOutput,
    queued: Mutex<VecDeque<Result<RawModelOutput>>>,
    fail_load: bool,
    delay: Option<Duration>,
    load_delay: Option<Duration>,
    pub loads: AtomicUsize,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Signalled when an inference call begins
    pub started: Notify,
}

impl ScriptedBackend {
    pub fn new(default_output: RawModelOutput) -> Self {
        Self {
            default_output,
            queued: Mutex::new(VecDeque::new()),
            fail_load: false,
            delay: None,
            load_delay: None,
            loads: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: Notify::new(),
        }
    }

    /// Single "person" box
    pub fn detector() -> Self {
        Self::new(RawModelOutput::Boxes {
            names: HashMap::from([(0, "person".to_string())]),
            xyxy: vec![[4.0, 4.0, 20.0, 30.0]],
            conf: vec![0.9],
            cls: vec![0],
        })
    }

    pub fn classifier() -> Self {
        Self::new(RawModelOutput::Probabilities {
            names: HashMap::from([(0, "cat".to_string()), (1, "dog".to_string())]),
            scores: vec![0.3, 0.7],
        })
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn push_result(&self, result: Result<RawModelOutput>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelBackend for Arc<ScriptedBackend> {
    type Handle = ();

    async fn load(&self, _model: ModelId) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_load {
            return Err(AppError::ModelLoad("weights missing".to_string()));
        }
        Ok(())
    }

    async fn infer(&self, _handle: &(), _frame: &Frame) -> Result<RawModelOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(self.default_output.clone()))
    }
}

// -- sink

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Published {
        session: SessionToken,
        frame_index: u64,
        count: usize,
        overlay: Size,
    },
    Cleared,
    Notice(Notice),
    State(LoopState),
}

/// Forwards every sink call to a channel
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for RecordingSink {
    fn publish(&self, update: ResultUpdate<'_>) {
        let _ = self.tx.send(SinkEvent::Published {
            session: update.session,
            frame_index: update.frame_index,
            count: update.predictions.len(),
            overlay: update.overlay.dimensions().into(),
        });
    }

    fn clear(&self) {
        let _ = self.tx.send(SinkEvent::Cleared);
    }

    fn notice(&self, notice: Notice) {
        let _ = self.tx.send(SinkEvent::Notice(notice));
    }

    fn state_changed(&self, state: LoopState) {
        let _ = self.tx.send(SinkEvent::State(state));
    }
}

/// Everything received so far, without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<SinkEvent>) -> Vec<SinkEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn publishes(events: &[SinkEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SinkEvent::Published { .. }))
        .count()
}

pub fn notice_titles(events: &[SinkEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::Notice(n) => Some(n.title.clone()),
            _ => None,
        })
        .collect()
}
