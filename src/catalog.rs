// -- external imports
use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumString, VariantNames};

use crate::media::{Facing, ReadyState};
use crate::prediction::LandmarkGroup;

// -- enums

/// Model family; selects the inference adapter and the overlay drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModelFamily {
    Classifier,
    Detector,
    LandmarkEstimator,
}

/// Demo models offered by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display, VariantNames)]
pub enum ModelId {
    #[default]
    #[strum(to_string = "MobileNet", serialize = "mobilenet")]
    MobileNet,

    #[strum(to_string = "CocoSsd", serialize = "coco-ssd")]
    CocoSsd,

    #[strum(to_string = "Handpose", serialize = "handpose")]
    Handpose,

    #[strum(to_string = "PoseNet", serialize = "posenet")]
    PoseNet,
}

/// Hand skeleton: every finger is a path starting at the wrist.
pub const HAND_GROUPS: [LandmarkGroup; 5] = [
    LandmarkGroup {
        name: "thumb",
        path: &[0, 1, 2, 3, 4],
    },
    LandmarkGroup {
        name: "indexFinger",
        path: &[0, 5, 6, 7, 8],
    },
    LandmarkGroup {
        name: "middleFinger",
        path: &[0, 9, 10, 11, 12],
    },
    LandmarkGroup {
        name: "ringFinger",
        path: &[0, 13, 14, 15, 16],
    },
    LandmarkGroup {
        name: "pinky",
        path: &[0, 17, 18, 19, 20],
    },
];

/// Body skeleton over the 17 COCO keypoints (nose, eyes, ears, shoulders,
/// elbows, wrists, hips, knees, ankles; left before right).
pub const POSE_GROUPS: [LandmarkGroup; 5] = [
    LandmarkGroup {
        name: "leftArm",
        path: &[5, 7, 9],
    },
    LandmarkGroup {
        name: "rightArm",
        path: &[6, 8, 10],
    },
    LandmarkGroup {
        name: "leftLeg",
        path: &[11, 13, 15],
    },
    LandmarkGroup {
        name: "rightLeg",
        path: &[12, 14, 16],
    },
    LandmarkGroup {
        name: "torso",
        path: &[5, 6, 12, 11, 5],
    },
];

impl ModelId {
    pub const fn family(&self) -> ModelFamily {
        match self {
            ModelId::MobileNet => ModelFamily::Classifier,
            ModelId::CocoSsd => ModelFamily::Detector,
            ModelId::Handpose | ModelId::PoseNet => ModelFamily::LandmarkEstimator,
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            ModelId::MobileNet => "MobileNet Image Classification",
            ModelId::CocoSsd => "COCO-SSD Object Detection",
            ModelId::Handpose => "Handpose Detection",
            ModelId::PoseNet => "PoseNet Pose Estimation",
        }
    }

    /// What the model finds, used in result lists and notices
    pub const fn subject(&self) -> (&'static str, &'static str) {
        match self {
            ModelId::MobileNet => ("class", "classes"),
            ModelId::CocoSsd => ("object", "objects"),
            ModelId::Handpose => ("Hand", "Hands"),
            ModelId::PoseNet => ("Pose", "Poses"),
        }
    }

    pub const fn default_facing(&self) -> Facing {
        match self {
            ModelId::CocoSsd => Facing::Environment,
            _ => Facing::User,
        }
    }

    /// Minimum camera readiness before a frame may be sampled
    pub const fn min_ready_state(&self) -> ReadyState {
        match self {
            ModelId::MobileNet => ReadyState::HaveEnoughData,
            _ => ReadyState::HaveFutureData,
        }
    }

    pub const fn landmark_groups(&self) -> &'static [LandmarkGroup] {
        match self {
            ModelId::Handpose => &HAND_GROUPS,
            ModelId::PoseNet => &POSE_GROUPS,
            _ => &[],
        }
    }

    /// Minimum instance/keypoint score drawn by the overlay
    pub const fn min_keypoint_score(&self) -> f32 {
        match self {
            ModelId::PoseNet => 0.2,
            _ => 0.0,
        }
    }

    /// Deprecation message for models that can no longer be loaded
    pub const fn deprecation(&self) -> Option<&'static str> {
        match self {
            ModelId::PoseNet => Some(
                "The PoseNet model package has been deprecated and removed. \
                 A different pose detection model will need to be used.",
            ),
            _ => None,
        }
    }

    pub const fn error_title(&self) -> &'static str {
        match self.family() {
            ModelFamily::Classifier => "Classification Error",
            _ => "Detection Error",
        }
    }
}

/// Custom deserializer with helpful error message
pub fn deserialize_model_id<'de, D>(deserializer: D) -> Result<ModelId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    ModelId::from_str(&value).map_err(|_| {
        let variants = ModelId::VARIANTS;
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", variants.join(", ")).as_str(),
        )
    })
}
