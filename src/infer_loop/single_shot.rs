use super::session::SessionKind;
use super::{Inner, LoopState, SessionToken, SourceTab, notices};
use crate::backend::ModelBackend;
use crate::error::{AppError, Result};
use crate::media::FrameStatus;
use crate::sink::ResultSink;

/// Upload flow: decode, infer once, publish.
pub(super) async fn run<B: ModelBackend, S: ResultSink>(
    inner: &Inner<B, S>,
    bytes: &[u8],
) -> Result<Option<SessionToken>> {
    let (session, frame, model) = {
        let mut shared = inner.lock();
        if !shared.state.can_upload() {
            inner.sink.notice(notices::unavailable(inner.model, shared.state));
            return Ok(None);
        }
        let Some(model) = shared.model.clone() else {
            inner.sink.notice(notices::unavailable(inner.model, shared.state));
            return Ok(None);
        };

        inner.teardown(&mut shared);
        shared.tab = SourceTab::Upload;

        let source = match shared.provider.activate_static_image(bytes) {
            Ok(source) => source,
            Err(e) => {
                tracing::error!("Failed to decode upload: {}", e);
                inner.sink.notice(notices::upload_error());
                return Err(e);
            }
        };

        let FrameStatus::Ready(frame) = shared.provider.frame(inner.model.min_ready_state()) else {
            return Err(AppError::Decode("uploaded image has no frame".to_string()));
        };

        let opened = inner.open_session(SessionKind::SingleShot, source);
        let session = opened.handle();
        shared.session = Some(opened);
        inner.set_state(&mut shared, LoopState::Running);
        (session, frame, model)
    };

    tracing::info!(
        "Single-shot session {:?} on {} upload",
        session.token,
        frame.size()
    );

    let Some(_guard) = session.try_begin_inference() else {
        return Ok(None);
    };

    let predictions = match inner.adapter.infer(&inner.backend, model.as_ref(), &frame).await {
        Ok(predictions) => predictions,
        Err(e) if e.is_session_fatal() => {
            tracing::error!("Session {:?} failed: {}", session.token, e);
            inner.fail_session(session.token);
            return Err(e);
        }
        Err(e) => {
            tracing::error!("Error running inference on upload: {}", e);
            let shared = inner.lock();
            if shared.is_live(session.token) {
                inner.sink.notice(notices::upload_inference_error(inner.model));
            }
            return Err(e);
        }
    };

    match inner.publish(session.token, &frame, &predictions) {
        Ok(()) => Ok(Some(session.token)),
        Err(AppError::StaleResult) => Ok(None),
        Err(e) => Err(e),
    }
}
