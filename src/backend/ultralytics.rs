use image::DynamicImage;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use ultralytics_inference as ul;

use super::{ModelBackend, RawInstance, RawModelOutput};
use crate::catalog::{ModelFamily, ModelId};
use crate::error::{AppError, Result};
use crate::media::Frame;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UltralyticsConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,

    /// Confidence threshold
    pub conf: f32,

    /// IoU threshold for NMS
    pub iou: f32,

    /// Device to use (cpu, cuda:0, mps, coreml, directml:0, openvino, tensorrt:0, etc.)
    pub device: Option<String>,
}

impl Default for UltralyticsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            conf: 0.25,
            iou: 0.45,
            device: None,
        }
    }
}

impl TryFrom<&UltralyticsConfig> for ul::InferenceConfig {
    type Error = AppError;

    fn try_from(args: &UltralyticsConfig) -> std::result::Result<Self, Self::Error> {
        let mut config = Self::new()
            .with_confidence(args.conf)
            .with_iou(args.iou)
            .with_batch(1);

        if let Some(ref device_str) = args.device {
            let device: ul::Device = device_str
                .parse()
                .map_err(|_| AppError::Config(format!("invalid device: {device_str}")))?;
            config = config.with_device(device);
        }

        Ok(config)
    }
}

/// YOLO models (classify / detect / pose) served through `ultralytics-inference`
#[derive(Debug, Clone)]
pub struct UltralyticsBackend {
    config: UltralyticsConfig,
}

impl UltralyticsBackend {
    pub fn new(config: UltralyticsConfig) -> Self {
        Self { config }
    }
}

/// Loaded model plus the family it was loaded for
pub struct UltralyticsHandle {
    model: Arc<Mutex<ul::YOLOModel>>,
    family: ModelFamily,
}

impl ModelBackend for UltralyticsBackend {
    type Handle = UltralyticsHandle;

    async fn load(&self, model: ModelId) -> Result<Self::Handle> {
        let start_time = Instant::now();
        let config: ul::InferenceConfig = (&self.config).try_into()?;
        let path = self.config.model_path.clone();

        tracing::info!("Loading {} from {:?}", model, path);
        let loaded = tokio::task::spawn_blocking(move || {
            ul::YOLOModel::load_with_config(&path, config)
                .map_err(|e| AppError::ModelLoad(e.to_string()))
        })
        .await
        .map_err(|e| AppError::ModelLoad(e.to_string()))??;
        tracing::info!("Model loaded in {:.3?}", start_time.elapsed());

        Ok(UltralyticsHandle {
            model: Arc::new(Mutex::new(loaded)),
            family: model.family(),
        })
    }

    async fn infer(&self, handle: &Self::Handle, frame: &Frame) -> Result<RawModelOutput> {
        let model = Arc::clone(&handle.model);
        let family = handle.family;
        let image = DynamicImage::ImageRgb8(frame.image.as_ref().clone());

        tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);
            let results = model
                .predict_image(&image, "".to_string())
                .map_err(|e| AppError::ModelExecution(e.to_string()))?;

            // One image at a time
            let result = results
                .into_iter()
                .next()
                .ok_or_else(|| AppError::ModelExecution("no results returned".to_string()))?;
            convert_results(&result, family)
        })
        .await
        .map_err(|e| AppError::ModelExecution(e.to_string()))?
    }
}

fn convert_results(result: &ul::Results, family: ModelFamily) -> Result<RawModelOutput> {
    match family {
        ModelFamily::Classifier => {
            let probs = result
                .probs
                .as_ref()
                .ok_or_else(|| AppError::ModelExecution("model returned no probabilities".into()))?;
            Ok(RawModelOutput::Probabilities {
                names: result.names.clone(),
                scores: probs.data.iter().copied().collect(),
            })
        }
        ModelFamily::Detector => {
            let Some(boxes) = result.boxes.as_ref() else {
                return Ok(RawModelOutput::Boxes {
                    names: result.names.clone(),
                    xyxy: vec![],
                    conf: vec![],
                    cls: vec![],
                });
            };
            let xyxy = boxes.xyxy();
            let conf = boxes.conf();
            let cls = boxes.cls();
            let n = boxes.len();
            Ok(RawModelOutput::Boxes {
                names: result.names.clone(),
                xyxy: (0..n)
                    .map(|i| [xyxy[[i, 0]], xyxy[[i, 1]], xyxy[[i, 2]], xyxy[[i, 3]]])
                    .collect(),
                conf: (0..n).map(|i| conf[i]).collect(),
                cls: (0..n).map(|i| cls[i] as usize).collect(),
            })
        }
        ModelFamily::LandmarkEstimator => {
            let Some(keypoints) = result.keypoints.as_ref() else {
                return Ok(RawModelOutput::Keypoints { instances: vec![] });
            };
            let kpt_data = &keypoints.data;
            let n_persons = kpt_data.shape()[0];
            let n_kpts = kpt_data.shape()[1];
            let box_conf = result.boxes.as_ref().map(|b| b.conf());

            let instances = (0..n_persons)
                .map(|p| {
                    let points: Vec<[f32; 3]> = (0..n_kpts)
                        .map(|k| [kpt_data[[p, k, 0]], kpt_data[[p, k, 1]], kpt_data[[p, k, 2]]])
                        .collect();
                    let score = match &box_conf {
                        Some(conf) if p < conf.len() => conf[p],
                        _ => mean_score(&points),
                    };
                    RawInstance { score, points }
                })
                .collect();
            Ok(RawModelOutput::Keypoints { instances })
        }
    }
}

fn mean_score(points: &[[f32; 3]]) -> f32 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p[2]).sum::<f32>() / points.len() as f32
}
