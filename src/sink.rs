use image::RgbaImage;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, TrySendError};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use strum::Display;

use crate::catalog::ModelId;
use crate::error::Result;
use crate::infer_loop::{LoopState, SessionToken};
use crate::prediction::Predictions;
use crate::progress_bar::session_spinner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    Info,
    Destructive,
}

/// User-visible, non-blocking message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One published inference result
#[derive(Debug, Clone, Copy)]
pub struct ResultUpdate<'a> {
    pub session: SessionToken,
    pub state: LoopState,
    pub frame_index: u64,
    pub predictions: &'a Predictions,
    pub overlay: &'a RgbaImage,
}

/// Receives predictions, overlays, state changes and notices of a controller
pub trait ResultSink: Send + Sync + 'static {
    fn publish(&self, update: ResultUpdate<'_>);

    /// Drop the displayed result list and overlay
    fn clear(&self);

    fn notice(&self, notice: Notice);

    fn state_changed(&self, _state: LoopState) {}
}

/// Text rows of the result list next to the overlay
pub fn result_lines(model: ModelId, predictions: &Predictions) -> Vec<String> {
    match predictions {
        Predictions::Classification(classes) => classes
            .iter()
            .map(|c| format!("{}: {:.2}%", c.display_label(), c.probability * 100.0))
            .collect(),
        Predictions::Detection(detections) => detections
            .iter()
            .map(|d| format!("{}: {:.1}%", d.label, d.score * 100.0))
            .collect(),
        Predictions::Landmarks(instances) => {
            if instances.is_empty() {
                return vec![];
            }
            let (singular, plural) = model.subject();
            let noun = if instances.len() > 1 { plural } else { singular };
            let mut lines = vec![format!("{} {} Detected", instances.len(), noun)];
            lines.extend(
                instances
                    .iter()
                    .enumerate()
                    .map(|(i, inst)| format!("{} #{}: {:.1}%", singular, i + 1, inst.score * 100.0)),
            );
            lines
        }
    }
}

/// Overlays waiting to be written; further saves are dropped while full
const SAVE_QUEUE: usize = 16;

type SaveJob = (PathBuf, RgbaImage);

/// Background thread writing overlays to disk
struct OverlayWriter {
    tx: mpsc::SyncSender<SaveJob>,
    handle: JoinHandle<()>,
}

impl OverlayWriter {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::sync_channel::<SaveJob>(SAVE_QUEUE);
        let handle = thread::spawn(move || {
            while let Ok((save_path, overlay)) = rx.recv() {
                if let Err(e) = overlay.save(&save_path) {
                    tracing::error!("Failed to save overlay to {:?}: {}", save_path, e);
                }
            }
        });
        Self { tx, handle }
    }
}

/// Reports sessions on the terminal; optionally saves every overlay as PNG.
///
/// Saving happens on a writer thread, so `publish` never touches the disk.
pub struct ConsoleSink {
    model: ModelId,
    spinner: ProgressBar,
    save_dir: Option<PathBuf>,
    writer: Mutex<Option<OverlayWriter>>,
    published: AtomicU64,
}

impl ConsoleSink {
    pub fn new(model: ModelId, save_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &save_dir {
            std::fs::create_dir_all(dir)?;
        }
        let writer = save_dir.as_ref().map(|_| OverlayWriter::spawn());
        Ok(Self {
            model,
            spinner: session_spinner(model.title()),
            save_dir,
            writer: Mutex::new(writer),
            published: AtomicU64::new(0),
        })
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Wait for pending overlay saves, then close the spinner
    pub fn finish(&self) {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(OverlayWriter { tx, handle }) = writer {
            drop(tx);
            if handle.join().is_err() {
                tracing::error!("Overlay writer thread panicked");
            }
        }
        if !self.spinner.is_finished() {
            self.spinner.finish_with_message("Finished");
        }
    }

    fn queue_save(&self, frame_index: u64, overlay: &RgbaImage) {
        let Some(dir) = &self.save_dir else {
            return;
        };
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(writer) = writer.as_ref() else {
            return;
        };

        let save_path = dir.join(format!("overlay_{:06}.png", frame_index));
        match writer.tx.try_send((save_path, overlay.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full((path, _))) => {
                tracing::warn!("Overlay writer is behind, skipping {:?}", path)
            }
            Err(TrySendError::Disconnected((path, _))) => {
                tracing::error!("Overlay writer has stopped, skipping {:?}", path)
            }
        }
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ResultSink for ConsoleSink {
    fn publish(&self, update: ResultUpdate<'_>) {
        let count = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        let lines = result_lines(self.model, update.predictions);

        self.spinner.set_position(count);
        self.spinner.set_message(
            lines
                .first()
                .cloned()
                .unwrap_or_else(|| "No predictions yet.".to_string()),
        );
        tracing::debug!(
            "Frame {} ({:?}): {:?}",
            update.frame_index,
            update.session,
            lines
        );

        self.queue_save(update.frame_index, update.overlay);
    }

    fn clear(&self) {
        self.spinner.set_message("No predictions yet.");
    }

    fn notice(&self, notice: Notice) {
        match notice.severity {
            Severity::Destructive => {
                tracing::error!("[{}] {}", notice.title, notice.description)
            }
            Severity::Info => tracing::info!("[{}] {}", notice.title, notice.description),
        }
    }

    fn state_changed(&self, state: LoopState) {
        tracing::info!("{}: {}", self.model, state);
    }
}
