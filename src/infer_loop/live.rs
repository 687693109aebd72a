use std::sync::Arc;
use tokio::time::{MissedTickBehavior, interval};

use super::session::SessionHandle;
use super::{Inner, notices};
use crate::backend::ModelBackend;
use crate::error::{AppError, Result};
use crate::media::FrameStatus;
use crate::sink::ResultSink;

/// What one tick of the live loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Published,
    /// Frame not ready, or the previous call still in flight
    Skipped,
    /// The session or its source is gone
    Ended,
}

/// Live loop of one camera session; exits when the session ends.
pub(super) async fn run<B: ModelBackend, S: ResultSink>(
    inner: Arc<Inner<B, S>>,
    session: SessionHandle,
) {
    let mut ticker = interval(inner.frame_interval);
    // the next tick waits a full period after a slow inference
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = session.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match tick(&inner, &session).await {
            Ok(Tick::Published) => failures = 0,
            Ok(Tick::Skipped) => {}
            Ok(Tick::Ended) | Err(AppError::StaleResult) => break,
            Err(e) if e.is_session_fatal() => {
                tracing::error!("Session {:?} failed: {}", session.token, e);
                inner.fail_session(session.token);
                break;
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    "Inference failed on session {:?} ({} in a row): {}",
                    session.token,
                    failures,
                    e
                );
                if failures == 1 {
                    let shared = inner.lock();
                    if shared.is_live(session.token) {
                        inner.sink.notice(notices::live_inference_error(inner.model));
                    }
                }
            }
        }
    }

    tracing::debug!("Live loop of session {:?} exited", session.token);
}

async fn tick<B: ModelBackend, S: ResultSink>(
    inner: &Inner<B, S>,
    session: &SessionHandle,
) -> Result<Tick> {
    let Some(_guard) = session.try_begin_inference() else {
        return Ok(Tick::Skipped);
    };

    let (frame, handle) = {
        let mut shared = inner.lock();
        if !shared.is_live(session.token) {
            return Ok(Tick::Ended);
        }
        let handle = shared
            .model
            .clone()
            .ok_or_else(|| AppError::ModelUnavailable(format!("{} is not loaded", inner.model)))?;

        match shared.provider.frame(inner.model.min_ready_state()) {
            FrameStatus::Ready(frame) => (frame, handle),
            FrameStatus::NotReady(state) => {
                tracing::debug!("Frame not ready ({}), skipping tick", state);
                return Ok(Tick::Skipped);
            }
            FrameStatus::Inactive => return Ok(Tick::Ended),
        }
    };

    let predictions = inner
        .adapter
        .infer(&inner.backend, handle.as_ref(), &frame)
        .await?;
    inner.publish(session.token, &frame, &predictions)?;
    Ok(Tick::Published)
}
