use std::collections::HashMap;

use crate::backend::{ModelBackend, RawInstance, RawModelOutput};
use crate::catalog::{ModelFamily, ModelId};
use crate::error::{AppError, Result};
use crate::media::Frame;
use crate::prediction::{
    BoundingBox, Classification, Detection, Keypoint, LandmarkGroup, LandmarkInstance, Predictions,
};

/// Normalizes raw model output of one model family into `Predictions`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InferenceAdapter {
    Classifier { top_k: Option<usize> },
    Detector,
    LandmarkEstimator { groups: &'static [LandmarkGroup] },
}

impl InferenceAdapter {
    pub fn for_model(model: ModelId, top_k: Option<usize>) -> Self {
        match model.family() {
            ModelFamily::Classifier => InferenceAdapter::Classifier { top_k },
            ModelFamily::Detector => InferenceAdapter::Detector,
            ModelFamily::LandmarkEstimator => InferenceAdapter::LandmarkEstimator {
                groups: model.landmark_groups(),
            },
        }
    }

    /// Run the model on one frame and normalize its output.
    ///
    /// Backend errors other than the session-fatal ones surface as
    /// `ModelExecution`.
    pub async fn infer<B: ModelBackend>(
        &self,
        backend: &B,
        handle: &B::Handle,
        frame: &Frame,
    ) -> Result<Predictions> {
        let raw = backend.infer(handle, frame).await.map_err(|e| match e {
            e if e.is_session_fatal() => e,
            AppError::ModelExecution(msg) => AppError::ModelExecution(msg),
            other => AppError::ModelExecution(other.to_string()),
        })?;
        self.normalize(raw)
    }

    pub fn normalize(&self, raw: RawModelOutput) -> Result<Predictions> {
        match (self, raw) {
            (InferenceAdapter::Classifier { top_k }, RawModelOutput::Probabilities { names, scores }) => {
                Ok(Predictions::Classification(normalize_probabilities(
                    &names, &scores, *top_k,
                )))
            }
            (
                InferenceAdapter::Detector,
                RawModelOutput::Boxes {
                    names,
                    xyxy,
                    conf,
                    cls,
                },
            ) => normalize_boxes(&names, &xyxy, &conf, &cls).map(Predictions::Detection),
            (InferenceAdapter::LandmarkEstimator { groups }, RawModelOutput::Keypoints { instances }) => {
                Ok(Predictions::Landmarks(normalize_instances(instances, *groups)))
            }
            (adapter, raw) => Err(AppError::ModelExecution(format!(
                "{} adapter cannot read {} output",
                adapter.name(),
                raw.kind()
            ))),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            InferenceAdapter::Classifier { .. } => "classifier",
            InferenceAdapter::Detector => "detector",
            InferenceAdapter::LandmarkEstimator { .. } => "landmark",
        }
    }
}

fn label_of(names: &HashMap<usize, String>, class_id: usize, fallback: &str) -> String {
    names
        .get(&class_id)
        .cloned()
        .unwrap_or_else(|| format!("{fallback} {class_id}"))
}

/// Sort classes by descending probability.
fn normalize_probabilities(
    names: &HashMap<usize, String>,
    scores: &[f32],
    top_k: Option<usize>,
) -> Vec<Classification> {
    let mut classes: Vec<Classification> = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .map(|(class_id, score)| Classification {
            label: label_of(names, class_id, "class"),
            probability: score.clamp(0.0, 1.0),
        })
        .collect();

    // stable sort keeps class-id order among ties
    classes.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    if let Some(k) = top_k {
        classes.truncate(k);
    }
    classes
}

fn normalize_boxes(
    names: &HashMap<usize, String>,
    xyxy: &[[f32; 4]],
    conf: &[f32],
    cls: &[usize],
) -> Result<Vec<Detection>> {
    if xyxy.len() != conf.len() || xyxy.len() != cls.len() {
        return Err(AppError::ModelExecution(format!(
            "mismatched box columns: {} boxes, {} scores, {} classes",
            xyxy.len(),
            conf.len(),
            cls.len()
        )));
    }

    Ok(xyxy
        .iter()
        .zip(conf)
        .zip(cls)
        .map(|((corners, &score), &class_id)| Detection {
            label: label_of(names, class_id, "object"),
            score: if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 },
            bbox: BoundingBox::from_xyxy(*corners),
        })
        .collect())
}

fn normalize_instances(
    instances: Vec<RawInstance>,
    groups: &'static [LandmarkGroup],
) -> Vec<LandmarkInstance> {
    instances
        .into_iter()
        .map(|instance| LandmarkInstance {
            score: instance.score,
            keypoints: instance
                .points
                .into_iter()
                .map(|[x, y, score]| Keypoint {
                    x,
                    y,
                    z: None,
                    score,
                })
                .collect(),
            groups,
        })
        .collect()
}
