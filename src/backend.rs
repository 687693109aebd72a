// -- submodules
#[cfg(feature = "ultralytics")]
mod ultralytics;

#[cfg(feature = "ultralytics")]
pub use ultralytics::{UltralyticsBackend, UltralyticsConfig, UltralyticsHandle};

// -- external imports
use std::collections::HashMap;
use std::future::Future;

use crate::catalog::ModelId;
use crate::error::Result;
use crate::media::Frame;

/// One detected instance of a keypoint model
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstance {
    pub score: f32,
    /// `[x, y, score]` per keypoint, in native frame pixels
    pub points: Vec<[f32; 3]>,
}

/// Output of a model call before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    /// One score per class id
    Probabilities {
        names: HashMap<usize, String>,
        scores: Vec<f32>,
    },

    /// Corner boxes `[x1, y1, x2, y2]` with parallel confidence and class columns
    Boxes {
        names: HashMap<usize, String>,
        xyxy: Vec<[f32; 4]>,
        conf: Vec<f32>,
        cls: Vec<usize>,
    },

    Keypoints { instances: Vec<RawInstance> },
}

impl RawModelOutput {
    pub const fn kind(&self) -> &'static str {
        match self {
            RawModelOutput::Probabilities { .. } => "probabilities",
            RawModelOutput::Boxes { .. } => "boxes",
            RawModelOutput::Keypoints { .. } => "keypoints",
        }
    }
}

/// Model execution capability.
///
/// `load` runs once per controller; the handle is shared by every session.
pub trait ModelBackend: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    fn load(&self, model: ModelId) -> impl Future<Output = Result<Self::Handle>> + Send;

    fn infer(
        &self,
        handle: &Self::Handle,
        frame: &Frame,
    ) -> impl Future<Output = Result<RawModelOutput>> + Send;
}
