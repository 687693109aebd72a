// -- submodules
mod camera;
mod provider;
mod replay;
mod source_utils;
mod upload;
#[cfg(feature = "v4l")]
mod v4l_camera;

pub use camera::CameraHandle;
pub use provider::{MediaSource, MediaSourceProvider};
pub use replay::ReplayCamera;
pub use upload::StaticImage;
#[cfg(feature = "v4l")]
pub use v4l_camera::V4lCamera;

// -- external imports
use image::RgbImage;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString, VariantNames};

use crate::error::Result;
use crate::prediction::Size;

// -- enums

/// Which camera to request on devices with more than one
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, VariantNames)]
pub enum Facing {
    #[strum(to_string = "user")]
    User,

    #[strum(to_string = "environment")]
    Environment,
}

/// Readiness of a live stream, ordered from nothing to fully buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Custom deserializer with helpful error message
pub fn deserialize_facing<'de, D>(deserializer: D) -> Result<Option<Facing>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(value) => Facing::from_str(&value).map(Some).map_err(|_| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&value),
                &format!("one of {}", Facing::VARIANTS.join(", ")).as_str(),
            )
        }),
    }
}

// -- structs

/// Identifies one activation of a media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceToken(pub(crate) u64);

/// One sampled image from the active source
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<RgbImage>,
    pub index: u64,
}

impl Frame {
    pub fn new(image: Arc<RgbImage>, index: u64) -> Self {
        Self { image, index }
    }

    pub fn size(&self) -> Size {
        self.image.dimensions().into()
    }
}

#[derive(Debug, Clone)]
pub enum FrameStatus {
    /// No source is active
    Inactive,
    /// The source exists but has not buffered enough to sample yet
    NotReady(ReadyState),
    Ready(Frame),
}

// -- traits

/// Platform camera capability
pub trait CameraDevice: Send {
    /// Request a stream; fails with `PermissionDenied` or `DeviceUnavailable`.
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>>;
}

/// A live, acquired camera stream
pub trait CameraStream: Send {
    fn ready_state(&self) -> ReadyState;

    /// Native resolution, known once metadata arrived
    fn native_size(&self) -> Option<Size>;

    /// Most recent frame, if any
    fn latest_frame(&mut self) -> Option<RgbImage>;

    /// Release the hardware; called exactly once per stream.
    fn stop(&mut self);
}
