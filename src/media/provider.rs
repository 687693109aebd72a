use super::{CameraDevice, CameraHandle, Facing, FrameStatus, ReadyState, SourceToken, StaticImage};
use crate::error::Result;
use crate::prediction::Size;

/// The active input of a page
#[derive(Debug)]
pub enum MediaSource {
    Camera(CameraHandle),
    StaticImage(StaticImage),
}

impl MediaSource {
    pub const fn is_camera(&self) -> bool {
        matches!(self, MediaSource::Camera(_))
    }

    fn release(&mut self) {
        match self {
            MediaSource::Camera(camera) => camera.deactivate(),
            // the decoded bitmap is freed when the source is dropped
            MediaSource::StaticImage(_) => {}
        }
    }
}

#[derive(Debug)]
struct ActiveSource {
    token: SourceToken,
    source: MediaSource,
}

/// Owns at most one active media source at a time.
///
/// Activating a source releases the previous one first, so two sessions can
/// never read the same camera.
pub struct MediaSourceProvider {
    camera: Box<dyn CameraDevice>,
    active: Option<ActiveSource>,
    next_token: u64,
}

impl MediaSourceProvider {
    pub fn new(camera: Box<dyn CameraDevice>) -> Self {
        Self {
            camera,
            active: None,
            next_token: 0,
        }
    }

    fn issue_token(&mut self) -> SourceToken {
        self.next_token += 1;
        SourceToken(self.next_token)
    }

    /// Request the camera; the previous source is released even on failure.
    pub fn activate_camera(&mut self, facing: Facing) -> Result<SourceToken> {
        self.release();

        let stream = self.camera.open(facing)?;
        let token = self.issue_token();
        self.active = Some(ActiveSource {
            token,
            source: MediaSource::Camera(CameraHandle::new(stream, facing)),
        });
        tracing::info!("Camera source activated ({}), token {:?}", facing, token);
        Ok(token)
    }

    /// Decode an upload; the previous source is released even on failure.
    pub fn activate_static_image(&mut self, bytes: &[u8]) -> Result<SourceToken> {
        self.release();

        let image = StaticImage::decode(bytes)?;
        let token = self.issue_token();
        tracing::info!(
            "Static image source activated ({}), token {:?}",
            image.native_size(),
            token
        );
        self.active = Some(ActiveSource {
            token,
            source: MediaSource::StaticImage(image),
        });
        Ok(token)
    }

    /// Release the source issued as `token`; stale tokens are ignored.
    pub fn deactivate(&mut self, token: SourceToken) -> bool {
        match &self.active {
            Some(active) if active.token == token => self.release(),
            _ => false,
        }
    }

    /// Release whatever source is active. Returns whether one was.
    pub fn release(&mut self) -> bool {
        match self.active.take() {
            Some(mut active) => {
                active.source.release();
                tracing::debug!("Source {:?} released", active.token);
                true
            }
            None => false,
        }
    }

    pub fn active_token(&self) -> Option<SourceToken> {
        self.active.as_ref().map(|a| a.token)
    }

    pub fn active_source(&self) -> Option<&MediaSource> {
        self.active.as_ref().map(|a| &a.source)
    }

    pub fn is_camera_active(&self) -> bool {
        self.active_source().is_some_and(MediaSource::is_camera)
    }

    pub fn native_size(&self) -> Option<Size> {
        match self.active_source()? {
            MediaSource::Camera(camera) => camera.native_size(),
            MediaSource::StaticImage(image) => Some(image.native_size()),
        }
    }

    /// Sample the active source. Static images are always fully buffered.
    pub fn frame(&mut self, min_ready: ReadyState) -> FrameStatus {
        match self.active.as_mut().map(|a| &mut a.source) {
            None => FrameStatus::Inactive,
            Some(MediaSource::Camera(camera)) => camera.frame(min_ready),
            Some(MediaSource::StaticImage(image)) => FrameStatus::Ready(image.frame()),
        }
    }
}

impl Drop for MediaSourceProvider {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::test_support::{CountingCamera, png_bytes};

    #[test]
    fn test_switching_sources_keeps_one_camera() {
        let camera = CountingCamera::default();
        let counters = camera.counters();
        let mut provider = MediaSourceProvider::new(Box::new(camera));

        for i in 0..5 {
            let facing = if i % 2 == 0 { Facing::User } else { Facing::Environment };
            provider.activate_camera(facing).unwrap();
            assert_eq!(counters.active(), 1);
        }
        assert_eq!(counters.opened(), 5);

        provider.activate_static_image(&png_bytes(4, 4)).unwrap();
        assert_eq!(counters.active(), 0);
        assert!(!provider.is_camera_active());
        assert_eq!(provider.native_size(), Some(Size::new(4, 4)));
    }

    #[test]
    fn test_deactivate_is_idempotent_and_token_checked() {
        let camera = CountingCamera::default();
        let counters = camera.counters();
        let mut provider = MediaSourceProvider::new(Box::new(camera));

        let first = provider.activate_camera(Facing::User).unwrap();
        let second = provider.activate_camera(Facing::User).unwrap();
        assert!(!provider.deactivate(first));
        assert_eq!(counters.active(), 1);

        assert!(provider.deactivate(second));
        assert!(!provider.deactivate(second));
        assert!(!provider.release());
        assert_eq!(counters.stopped(), 2);
        assert!(matches!(provider.frame(ReadyState::HaveNothing), FrameStatus::Inactive));
    }

    #[test]
    fn test_failed_upload_leaves_nothing_active() {
        let camera = CountingCamera::default();
        let counters = camera.counters();
        let mut provider = MediaSourceProvider::new(Box::new(camera));

        provider.activate_camera(Facing::User).unwrap();
        let err = provider.activate_static_image(b"garbage").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
        assert!(provider.active_token().is_none());
        assert_eq!(counters.active(), 0);
    }

    #[test]
    fn test_camera_denied_is_reported() {
        let camera = CountingCamera::default().deny_permission();
        let mut provider = MediaSourceProvider::new(Box::new(camera));
        assert!(matches!(
            provider.activate_camera(Facing::User),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(provider.active_source().is_none());
    }

    #[test]
    fn test_frame_waits_for_readiness() {
        let camera = CountingCamera::default().with_ready_state(ReadyState::HaveMetadata);
        let mut provider = MediaSourceProvider::new(Box::new(camera));
        provider.activate_camera(Facing::User).unwrap();
        assert!(matches!(
            provider.frame(ReadyState::HaveEnoughData),
            FrameStatus::NotReady(ReadyState::HaveMetadata)
        ));
        assert!(matches!(
            provider.frame(ReadyState::HaveMetadata),
            FrameStatus::Ready(_)
        ));
    }

    #[test]
    fn test_drop_releases_camera() {
        let camera = CountingCamera::default();
        let counters = camera.counters();
        {
            let mut provider = MediaSourceProvider::new(Box::new(camera));
            provider.activate_camera(Facing::User).unwrap();
        }
        assert_eq!(counters.active(), 0);
        assert_eq!(counters.stopped(), 1);
    }
}
