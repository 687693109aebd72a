use super::LoopState;
use crate::catalog::{ModelFamily, ModelId};
use crate::sink::Notice;

pub fn model_error(model: ModelId) -> Notice {
    Notice::destructive(
        "Model Error",
        format!(
            "Failed to load the {} model. Please refresh the page.",
            model.title()
        ),
    )
}

pub fn model_not_available(message: &str) -> Notice {
    Notice::destructive("Model not available", message)
}

pub fn webcam_error() -> Notice {
    Notice::destructive(
        "Webcam Error",
        "Could not access the webcam. Please check permissions and try again.",
    )
}

pub fn upload_error() -> Notice {
    Notice::destructive("Upload Error", "Could not read the uploaded image.")
}

pub fn live_inference_error(model: ModelId) -> Notice {
    let action = match model.family() {
        ModelFamily::Classifier => "classify the webcam feed",
        _ => "run detection on the webcam feed",
    };
    Notice::destructive(model.error_title(), format!("Could not {action}."))
}

pub fn upload_inference_error(model: ModelId) -> Notice {
    let action = match model.family() {
        ModelFamily::Classifier => "classify",
        _ => "run detection on",
    };
    Notice::destructive(
        model.error_title(),
        format!("Could not {action} the uploaded image."),
    )
}

/// Why start/upload did nothing in `state`
pub fn unavailable(model: ModelId, state: LoopState) -> Notice {
    match (state, model.deprecation()) {
        (LoopState::Failed, Some(message)) => model_not_available(message),
        (LoopState::Failed, None) => model_error(model),
        (LoopState::Running, _) => Notice::info("Webcam Active", "The webcam is already running."),
        _ => Notice::info(
            "Model Loading",
            format!("The {} model is not ready yet.", model.title()),
        ),
    }
}
