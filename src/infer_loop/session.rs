use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::media::SourceToken;

/// Identifies one session of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionKind {
    /// Repeated inference over a camera stream
    Live,
    /// One inference over an uploaded image
    SingleShot,
}

/// Liveness shared between the controller and the session's task
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    pub token: SessionToken,
    active: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Claim the session's single inference slot
    pub fn try_begin_inference(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: Arc::clone(&self.in_flight),
            })
    }
}

/// Releases the in-flight slot when the call resolves or is dropped
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The controller's record of the current session
#[derive(Debug)]
pub(crate) struct Session {
    pub kind: SessionKind,
    pub source: SourceToken,
    handle: SessionHandle,
}

impl Session {
    pub fn new(token: SessionToken, kind: SessionKind, source: SourceToken) -> Self {
        Self {
            kind,
            source,
            handle: SessionHandle {
                token,
                active: Arc::new(AtomicBool::new(true)),
                in_flight: Arc::new(AtomicBool::new(false)),
                cancel: CancellationToken::new(),
            },
        }
    }

    pub fn token(&self) -> SessionToken {
        self.handle.token
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_camera(&self) -> bool {
        self.kind == SessionKind::Live
    }

    pub fn is_live(&self, token: SessionToken) -> bool {
        self.handle.token == token && self.handle.is_active()
    }

    /// Mark inactive and cancel the pending tick
    pub fn end(&self) {
        self.handle.active.store(false, Ordering::Release);
        self.handle.cancel.cancel();
    }
}
