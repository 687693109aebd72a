use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model execution failed: {0}")]
    ModelExecution(String),

    #[error("Result arrived after its session ended")]
    StaleResult,

    #[error("Font loading failed: {0}")]
    FontLoad(String),

    #[error("Assistant flow failed: {0}")]
    Assistant(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    /// Whether the error ends the running session instead of skipping one frame.
    pub const fn is_session_fatal(&self) -> bool {
        matches!(self, AppError::ModelUnavailable(_) | AppError::ModelLoad(_))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Decode(err.to_string())
    }
}

/// Result type with default AppError
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fatal_classification() {
        assert!(AppError::ModelUnavailable("gone".into()).is_session_fatal());
        assert!(!AppError::ModelExecution("oom".into()).is_session_fatal());
        assert!(!AppError::StaleResult.is_session_fatal());
    }
}
