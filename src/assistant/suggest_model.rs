use serde::{Deserialize, Serialize};

use super::{TextGenerator, parse_reply};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestModelOutput {
    /// Name of the suggested pre-trained model
    pub suggested_model: String,

    /// Why the model suits the task
    pub reason: String,
}

fn render_prompt(task: &str) -> String {
    format!(
        "You are an AI model expert. Given the following image classification task \
         description, suggest a suitable pre-trained model and explain why it is suitable.\n\n\
         Task Description: {task}\n\n\
         Respond with a JSON object with the string fields \"suggestedModel\" and \"reason\"."
    )
}

/// Suggest a pre-trained model for the task described in `prompt`.
pub async fn suggest_model<G: TextGenerator>(generator: &G, prompt: &str) -> Result<SuggestModelOutput> {
    let task = prompt.trim();
    if task.is_empty() {
        return Err(AppError::Assistant("task description is empty".to_string()));
    }

    let reply = generator.generate(&render_prompt(task)).await?;
    let output: SuggestModelOutput = parse_reply(&reply)?;
    if output.suggested_model.trim().is_empty() {
        return Err(AppError::Assistant("reply names no model".to_string()));
    }

    tracing::info!("Suggested model: {}", output.suggested_model);
    Ok(output)
}
