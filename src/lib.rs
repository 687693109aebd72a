mod adapter;
mod annotate;
mod assistant;
mod backend;
mod catalog;
mod error;
mod infer_loop;
mod logging;
mod media;
mod prediction;
mod progress_bar;
mod sink;
mod toml_utils;

#[cfg(test)]
mod test_support;

pub use adapter::InferenceAdapter;
pub use annotate::{AnnotateConfigs, OverlayRenderer, Scale};
pub use catalog::{ModelFamily, ModelId};
pub use error::{AppError, Result};
pub use logging::init_logger;
pub use prediction::{
    BoundingBox, Classification, Detection, Keypoint, LandmarkGroup, LandmarkInstance,
    Predictions, Size,
};
pub use progress_bar::progress_bar_style;
pub use toml_utils::{RunConfig, SessionConfig, parse_toml};

// Controller
pub use infer_loop::{InferenceLoop, LoopConfig, LoopState, SessionToken, SourceTab};

// Media sources
pub use media::{
    CameraDevice, CameraHandle, CameraStream, Facing, Frame, FrameStatus, MediaSource,
    MediaSourceProvider, ReadyState, ReplayCamera, SourceToken, StaticImage,
};
#[cfg(feature = "v4l")]
pub use media::V4lCamera;

// Model backends
pub use backend::{ModelBackend, RawInstance, RawModelOutput};
#[cfg(feature = "ultralytics")]
pub use backend::{UltralyticsBackend, UltralyticsConfig, UltralyticsHandle};

// Result sinks
pub use sink::{ConsoleSink, Notice, ResultSink, ResultUpdate, Severity, result_lines};

// Assistant flows
pub use assistant::{
    ClassificationResult, SuggestModelOutput, SummarizeResultsOutput, TextGenerator,
    suggest_model, summarize_results,
};
