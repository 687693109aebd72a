//! Page controller: owns the model handle, the media source and the session
//! that drives inference over it.
//!
//! Every mutation of the shared state happens under one lock, and results are
//! published only after re-checking that their session is still live, so a
//! stopped or superseded session can never reach the sink.

// -- submodules
mod live;
mod notices;
mod session;
mod single_shot;
mod state;

pub use session::SessionToken;
pub use state::{LoopState, SourceTab, deserialize_source_tab};

// -- external imports
use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::adapter::InferenceAdapter;
use crate::annotate::{OverlayRenderer, clear};
use crate::backend::ModelBackend;
use crate::catalog::ModelId;
use crate::error::{AppError, Result};
use crate::media::{CameraDevice, Facing, Frame, MediaSourceProvider};
use crate::prediction::{Predictions, Size};
use crate::sink::{ResultSink, ResultUpdate};
use session::{Session, SessionKind};

/// Shortest tick accepted for the live loop
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub model: ModelId,

    /// Live-loop tick; one display refresh
    pub frame_interval: Duration,

    /// Overlay size; `None` renders at the frame's native size
    pub display: Option<Size>,

    /// Classification results kept after sorting
    pub top_k: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            frame_interval: Duration::from_millis(16),
            display: None,
            top_k: None,
        }
    }
}

struct Shared<H> {
    state: LoopState,
    tab: SourceTab,
    model: Option<Arc<H>>,
    provider: MediaSourceProvider,
    session: Option<Session>,
    display: Option<Size>,
    overlay: RgbaImage,
}

impl<H> Shared<H> {
    fn is_live(&self, token: SessionToken) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_live(token))
    }
}

struct Inner<B: ModelBackend, S: ResultSink> {
    model: ModelId,
    adapter: InferenceAdapter,
    backend: B,
    sink: S,
    renderer: OverlayRenderer,
    frame_interval: Duration,
    next_session: AtomicU64,
    shared: Mutex<Shared<B::Handle>>,
}

/// Drives one model page: model loading, camera sessions and uploads.
///
/// Camera sessions spawn their loop on the ambient tokio runtime.
pub struct InferenceLoop<B: ModelBackend, S: ResultSink> {
    inner: Arc<Inner<B, S>>,
}

impl<B: ModelBackend, S: ResultSink> InferenceLoop<B, S> {
    pub fn new(
        config: LoopConfig,
        backend: B,
        sink: S,
        camera: Box<dyn CameraDevice>,
        renderer: OverlayRenderer,
    ) -> Self {
        let inner = Inner {
            model: config.model,
            adapter: InferenceAdapter::for_model(config.model, config.top_k),
            backend,
            sink,
            renderer,
            frame_interval: config.frame_interval.max(MIN_FRAME_INTERVAL),
            next_session: AtomicU64::new(0),
            shared: Mutex::new(Shared {
                state: LoopState::Idle,
                tab: SourceTab::default(),
                model: None,
                provider: MediaSourceProvider::new(camera),
                session: None,
                display: config.display,
                overlay: RgbaImage::new(0, 0),
            }),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn model(&self) -> ModelId {
        self.inner.model
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    pub fn state(&self) -> LoopState {
        self.inner.lock().state
    }

    pub fn tab(&self) -> SourceTab {
        self.inner.lock().tab
    }

    pub fn active_session(&self) -> Option<SessionToken> {
        self.inner.lock().session.as_ref().map(Session::token)
    }

    pub fn is_camera_active(&self) -> bool {
        self.inner.lock().provider.is_camera_active()
    }

    /// Load the model once. Later calls return without reloading.
    ///
    /// Fails with `ModelUnavailable` while another load is outstanding or
    /// after a failed one.
    pub async fn load(&self) -> Result<()> {
        let inner = &self.inner;
        {
            let mut shared = inner.lock();
            let state = shared.state;
            match state {
                LoopState::Idle => inner.set_state(&mut shared, LoopState::Loading),
                LoopState::Loading => {
                    return Err(AppError::ModelUnavailable(format!(
                        "{} is still loading",
                        inner.model
                    )));
                }
                LoopState::Failed => {
                    return Err(AppError::ModelUnavailable(format!(
                        "{} failed to load",
                        inner.model
                    )));
                }
                _ => return Ok(()),
            }

            if let Some(message) = inner.model.deprecation() {
                tracing::error!("{} is deprecated: {}", inner.model, message);
                inner.set_state(&mut shared, LoopState::Failed);
                inner.sink.notice(notices::model_not_available(message));
                return Err(AppError::ModelUnavailable(message.to_string()));
            }
        }

        tracing::info!("Loading model: {}", inner.model.title());
        let loaded = inner.backend.load(inner.model).await;

        let mut shared = inner.lock();
        match loaded {
            Ok(handle) => {
                shared.model = Some(Arc::new(handle));
                inner.set_state(&mut shared, LoopState::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load model {}: {}", inner.model, e);
                inner.set_state(&mut shared, LoopState::Failed);
                inner.sink.notice(notices::model_error(inner.model));
                Err(e)
            }
        }
    }

    /// Start a live camera session, facing the model's default if `None`.
    ///
    /// Returns `Ok(None)` when the controller cannot start in its current
    /// state; a notice tells the user why.
    pub fn start_camera(&self, facing: Option<Facing>) -> Result<Option<SessionToken>> {
        let inner = &self.inner;
        let facing = facing.unwrap_or(inner.model.default_facing());

        let handle = {
            let mut shared = inner.lock();
            // a running upload gives way to the camera; a running camera does not
            let camera_running = shared.session.as_ref().is_some_and(Session::is_camera);
            let allowed = match shared.state {
                LoopState::Running => !camera_running,
                state => state.can_start(),
            };
            if !allowed {
                inner.sink.notice(notices::unavailable(inner.model, shared.state));
                return Ok(None);
            }

            inner.teardown(&mut shared);
            shared.tab = SourceTab::Webcam;

            let source = match shared.provider.activate_camera(facing) {
                Ok(source) => source,
                Err(e) => {
                    tracing::error!("Error accessing webcam: {}", e);
                    inner.sink.notice(notices::webcam_error());
                    return Err(e);
                }
            };

            let session = inner.open_session(SessionKind::Live, source);
            let handle = session.handle();
            shared.session = Some(session);
            inner.set_state(&mut shared, LoopState::Running);
            handle
        };

        tracing::info!("Live session {:?} started ({})", handle.token, facing);
        let token = handle.token;
        tokio::spawn(live::run(Arc::clone(inner), handle));
        Ok(Some(token))
    }

    /// Decode `bytes` and run one inference over it.
    ///
    /// Returns `Ok(None)` when nothing ran: the controller cannot accept an
    /// upload in its current state, or the session ended before publishing.
    pub async fn upload_image(&self, bytes: &[u8]) -> Result<Option<SessionToken>> {
        single_shot::run(&self.inner, bytes).await
    }

    /// Drop the uploaded image and its predictions
    pub fn clear_upload(&self) {
        let mut shared = self.inner.lock();
        if shared.tab == SourceTab::Upload {
            self.inner.teardown(&mut shared);
        }
    }

    /// End the current session and release its source
    pub fn stop(&self) {
        let mut shared = self.inner.lock();
        self.inner.teardown(&mut shared);
    }

    pub fn switch_tab(&self, tab: SourceTab) {
        let mut shared = self.inner.lock();
        if shared.tab == tab {
            return;
        }
        self.inner.teardown(&mut shared);
        shared.tab = tab;
        tracing::debug!("Switched to {} tab", tab);
    }

    /// Display geometry for subsequent renders
    pub fn set_display_size(&self, size: Size) {
        self.inner.lock().display = Some(size);
    }
}

impl<B: ModelBackend, S: ResultSink> Drop for InferenceLoop<B, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<B: ModelBackend, S: ResultSink> Inner<B, S> {
    fn lock(&self) -> MutexGuard<'_, Shared<B::Handle>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, shared: &mut Shared<B::Handle>, state: LoopState) {
        if shared.state == state {
            return;
        }
        tracing::info!("{}: {} -> {}", self.model, shared.state, state);
        shared.state = state;
        self.sink.state_changed(state);
    }

    fn open_session(&self, kind: SessionKind, source: crate::media::SourceToken) -> Session {
        let token = SessionToken(self.next_session.fetch_add(1, Ordering::Relaxed) + 1);
        Session::new(token, kind, source)
    }

    /// End the current session, release its source and clear the results.
    fn teardown(&self, shared: &mut Shared<B::Handle>) -> bool {
        let Some(session) = shared.session.take() else {
            return false;
        };

        session.end();
        shared.provider.deactivate(session.source);
        clear(&mut shared.overlay);
        self.sink.clear();
        if shared.state == LoopState::Running {
            self.set_state(shared, LoopState::Stopped);
        }
        tracing::info!("{:?} session {:?} ended", session.kind, session.token());
        true
    }

    /// End `token`'s session after a session-fatal error
    fn fail_session(&self, token: SessionToken) {
        let mut shared = self.lock();
        if !shared.is_live(token) {
            return;
        }
        self.teardown(&mut shared);
        shared.model = None;
        self.set_state(&mut shared, LoopState::Failed);
        self.sink.notice(notices::model_error(self.model));
    }

    /// Render and publish if `token` is still live; `StaleResult` otherwise.
    fn publish(&self, token: SessionToken, frame: &Frame, predictions: &Predictions) -> Result<()> {
        let mut guard = self.lock();
        if !guard.is_live(token) {
            tracing::debug!("Discarding result of ended session {:?}", token);
            return Err(AppError::StaleResult);
        }

        let shared = &mut *guard;
        let native = frame.size();
        let display = shared.display.unwrap_or(native);
        self.renderer
            .render_into(&mut shared.overlay, predictions, native, display);

        self.sink.publish(ResultUpdate {
            session: token,
            state: shared.state,
            frame_index: frame.index,
            predictions,
            overlay: &shared.overlay,
        });
        Ok(())
    }
}
