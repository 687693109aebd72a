//! Typed request/response flows around a hosted text generator.

// -- submodules
mod suggest_model;
mod summarize;

pub use suggest_model::{SuggestModelOutput, suggest_model};
pub use summarize::{ClassificationResult, SummarizeResultsOutput, summarize_results};

// -- external imports
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::error::{AppError, Result};

/// Hosted language model capability
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Parse the JSON object in a generator reply, tolerating code fences and
/// surrounding prose.
fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(AppError::Assistant(format!(
                "reply contains no JSON object: {:?}",
                reply
            )));
        }
    };
    Ok(serde_json::from_str(json)?)
}
