// -- imports
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotate::AnnotateConfigs;
use crate::catalog::{ModelId, deserialize_model_id};
use crate::error::{AppError, Result};
use crate::infer_loop::{LoopConfig, SourceTab, deserialize_source_tab};
use crate::media::{Facing, deserialize_facing};
use crate::prediction::Size;

// -- config

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Demo model to run
    #[serde(deserialize_with = "deserialize_model_id")]
    pub model: ModelId,

    /// Input mode: webcam loop or single upload
    #[serde(deserialize_with = "deserialize_source_tab")]
    pub tab: SourceTab,

    /// Camera facing; the model's default if unset
    #[serde(deserialize_with = "deserialize_facing")]
    pub facing: Option<Facing>,

    /// Live-loop tick in milliseconds
    pub frame_interval_ms: u64,

    /// Overlay size; the frame's native size if unset
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,

    /// Directory replayed as the `user` camera
    pub camera_dir: Option<PathBuf>,

    /// Directory replayed as the `environment` camera
    pub environment_dir: Option<PathBuf>,

    /// Video4Linux device path, used instead of the replay camera
    pub v4l_device: Option<String>,

    /// Image file for the upload tab
    pub upload: Option<PathBuf>,

    /// Stop the webcam session after this many published frames
    pub max_frames: Option<u64>,

    /// Directory to save overlays
    pub save_dir: Option<PathBuf>,

    /// Classification results kept after sorting
    pub top_k: Option<usize>,

    /// Path to ONNX model file
    pub model_path: PathBuf,

    /// Confidence threshold
    pub conf: f32,

    /// IoU threshold for NMS
    pub iou: f32,

    /// Inference device (cpu, cuda:0, ...)
    pub device: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            tab: SourceTab::default(),
            facing: None,
            frame_interval_ms: 16,
            display_width: None,
            display_height: None,
            camera_dir: None,
            environment_dir: None,
            v4l_device: None,
            upload: None,
            max_frames: None,
            save_dir: None,
            top_k: None,
            model_path: PathBuf::new(),
            conf: 0.25,
            iou: 0.45,
            device: None,
        }
    }
}

impl SessionConfig {
    pub fn display(&self) -> Option<Size> {
        match (self.display_width, self.display_height) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            _ => None,
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            model: self.model,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            display: self.display(),
            top_k: self.top_k,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.frame_interval_ms == 0 {
            return Err(AppError::Config("frame_interval_ms must be positive".into()));
        }
        if self.display_width.is_some() != self.display_height.is_some() {
            return Err(AppError::Config(
                "display_width and display_height must be set together".into(),
            ));
        }
        if self.display().is_some_and(|d| d.is_empty()) {
            return Err(AppError::Config("display size must be non-zero".into()));
        }
        match self.tab {
            SourceTab::Upload if self.upload.is_none() => Err(AppError::Config(
                "the upload tab needs an `upload` image path".into(),
            )),
            SourceTab::Webcam if self.camera_dir.is_none() && self.v4l_device.is_none() => {
                Err(AppError::Config(
                    "the webcam tab needs `camera_dir` or `v4l_device`".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(feature = "ultralytics")]
impl From<&SessionConfig> for crate::backend::UltralyticsConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            conf: config.conf,
            iou: config.iou,
            device: config.device.clone(),
        }
    }
}

/// Parsed run configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub session: SessionConfig,
    pub annotate: AnnotateConfigs,
}

impl RunConfig {
    /// Parse TOML config file with explicit project root for path resolution.
    ///
    /// # Arguments
    ///
    /// * `toml_path` - Path to the TOML config file
    /// * `project_root` - Base directory for resolving relative paths
    ///
    /// # Errors
    ///
    /// Returns `AppError` if:
    /// - The path is not a valid toml file
    /// - File read fails
    /// - TOML parsing fails
    /// - The session settings contradict each other
    pub fn from_toml(toml_path: &Path, project_root: &Path) -> Result<Self> {
        if !toml_path.is_file() || toml_path.extension().is_some_and(|ext| ext != "toml") {
            return Err(AppError::Config(format!(
                "TOML config path is not a valid .toml file: {:?}",
                toml_path
            )));
        }

        let content = std::fs::read_to_string(toml_path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve_paths(project_root);
        config.session.validate()?;

        Ok(config)
    }

    /// Resolve relative paths against project root
    fn resolve_paths(&mut self, project_root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if !p.as_os_str().is_empty() && !p.is_absolute() {
                *p = project_root.join(&*p);
            }
        };

        let session = &mut self.session;
        resolve(&mut session.model_path);
        for path in [
            &mut session.camera_dir,
            &mut session.environment_dir,
            &mut session.upload,
            &mut session.save_dir,
            &mut self.annotate.font_path,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

// -- public API

/// Parse TOML config file and return the run configuration.
///
/// # Errors
///
/// Returns `AppError` if TOML parsing, path resolution or validation fails.
pub fn parse_toml(toml_path: &Path, project_root: &Path) -> Result<RunConfig> {
    RunConfig::from_toml(toml_path, project_root)
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_with_custom_values() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        let toml_content = r#"
[session]
model = "coco-ssd"
facing = "environment"
frame_interval_ms = 33
display_width = 640
display_height = 360
camera_dir = "frames"
max_frames = 120
save_dir = "runs/overlays"
model_path = "models/yolo11n.onnx"
conf = 0.7
iou = 0.5

[annotate]
show_box = false
show_conf = false
line_width = 4
min_keypoint_score = 0.3
top_k = 5
"#;
        fs::write(&toml_path, toml_content).unwrap();

        let config = RunConfig::from_toml(&toml_path, temp_dir.path()).unwrap();
        let session = &config.session;

        assert_eq!(session.model, ModelId::CocoSsd);
        assert_eq!(session.tab, SourceTab::Webcam);
        assert_eq!(session.facing, Some(Facing::Environment));
        assert_eq!(session.display(), Some(Size::new(640, 360)));
        assert_eq!(session.max_frames, Some(120));
        assert_eq!(session.conf, 0.7);
        assert_eq!(session.camera_dir, Some(temp_dir.path().join("frames")));
        assert_eq!(session.save_dir, Some(temp_dir.path().join("runs/overlays")));
        assert_eq!(session.model_path, temp_dir.path().join("models/yolo11n.onnx"));

        let loop_config = session.loop_config();
        assert_eq!(loop_config.frame_interval, Duration::from_millis(33));

        assert!(!config.annotate.show_box);
        assert!(config.annotate.show_label);
        assert!(!config.annotate.show_conf);
        assert_eq!(config.annotate.line_width, 4);
        assert_eq!(config.annotate.min_keypoint_score, Some(0.3));
        assert_eq!(config.annotate.top_k, Some(5));
    }

    #[test]
    fn test_upload_tab_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(
            &toml_path,
            "[session]\nmodel = \"mobilenet\"\ntab = \"upload\"\nupload = \"/abs/cat.png\"\n",
        )
        .unwrap();

        let config = parse_toml(&toml_path, temp_dir.path()).unwrap();
        assert_eq!(config.session.model, ModelId::MobileNet);
        assert_eq!(config.session.upload, Some(PathBuf::from("/abs/cat.png")));
        assert_eq!(config.session.frame_interval_ms, 16);
        assert!(config.annotate.show_box);
        assert!(config.session.display().is_none());
    }

    #[test]
    fn test_unknown_model_lists_variants() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[session]\nmodel = \"blazeface\"\n").unwrap();

        let err = parse_toml(&toml_path, temp_dir.path()).unwrap_err();
        assert!(matches!(err, AppError::TomlConfig(_)));
        assert!(err.to_string().to_lowercase().contains("mobilenet"));
    }

    #[test]
    fn test_contradicting_session_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");

        fs::write(&toml_path, "[session]\ntab = \"upload\"\n").unwrap();
        assert!(matches!(
            parse_toml(&toml_path, temp_dir.path()),
            Err(AppError::Config(_))
        ));

        fs::write(
            &toml_path,
            "[session]\ncamera_dir = \"frames\"\ndisplay_width = 100\n",
        )
        .unwrap();
        assert!(matches!(
            parse_toml(&toml_path, temp_dir.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_from_toml_invalid_path() {
        let invalid_path = PathBuf::from("/nonexistent/config.toml");
        let project_root = PathBuf::from("/tmp");
        assert!(RunConfig::from_toml(&invalid_path, &project_root).is_err());
    }

    #[test]
    fn test_from_toml_invalid_extension() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_path = temp_dir.path().join("config.txt");
        fs::write(&invalid_path, "session = { model = \"mobilenet\" }").unwrap();
        assert!(RunConfig::from_toml(&invalid_path, temp_dir.path()).is_err());
    }

    #[test]
    fn test_parse_toml_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_toml_path = temp_dir.path().join("invalid.toml");
        fs::write(&invalid_toml_path, "invalid toml [[[").unwrap();
        assert!(parse_toml(&invalid_toml_path, temp_dir.path()).is_err());
    }
}
