use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::{TextGenerator, parse_reply};
use crate::error::{AppError, Result};
use crate::prediction::Classification;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub class_name: String,

    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl From<&Classification> for ClassificationResult {
    fn from(c: &Classification) -> Self {
        Self {
            class_name: c.label.clone(),
            confidence: c.probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeResultsOutput {
    pub summary: String,
}

fn render_prompt(results: &[ClassificationResult]) -> String {
    let mut prompt = String::from(
        "You are an AI assistant that summarizes image classification results. Given a list \
         of classification results, you should identify the most frequently identified classes \
         and the overall confidence scores.\n\nClassification Results:\n",
    );
    for r in results {
        let _ = writeln!(prompt, "- Class: {}, Confidence: {}", r.class_name, r.confidence);
    }
    prompt.push_str(
        "\nProvide a concise summary of the results, highlighting the most frequent classes \
         and overall confidence. Respond with a JSON object with the string field \"summary\".",
    );
    prompt
}

/// Summarize a batch of classification results.
pub async fn summarize_results<G: TextGenerator>(
    generator: &G,
    results: &[ClassificationResult],
) -> Result<SummarizeResultsOutput> {
    if results.is_empty() {
        return Err(AppError::Assistant("no results to summarize".to_string()));
    }
    if let Some(bad) = results
        .iter()
        .find(|r| !(0.0..=1.0).contains(&r.confidence))
    {
        return Err(AppError::Assistant(format!(
            "confidence of {:?} outside [0, 1]: {}",
            bad.class_name, bad.confidence
        )));
    }

    let reply = generator.generate(&render_prompt(results)).await?;
    parse_reply(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::CannedGenerator;

    #[tokio::test]
    async fn test_summarize_lists_every_result() {
        let generator = CannedGenerator::new(r#"{"summary": "Mostly cats."}"#);
        let results: Vec<ClassificationResult> = [
            Classification {
                label: "tabby".into(),
                probability: 0.5,
            },
            Classification {
                label: "lynx".into(),
                probability: 0.25,
            },
        ]
        .iter()
        .map(Into::into)
        .collect();

        let output = summarize_results(&generator, &results).await.unwrap();
        assert_eq!(output.summary, "Mostly cats.");

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Class: tabby, Confidence: 0.5\n"));
        assert!(prompts[0].contains("- Class: lynx, Confidence: 0.25\n"));
    }

    #[tokio::test]
    async fn test_summarize_rejects_bad_input() {
        let generator = CannedGenerator::new(r#"{"summary": "x"}"#);
        assert!(summarize_results(&generator, &[]).await.is_err());

        let out_of_range = [ClassificationResult {
            class_name: "cat".into(),
            confidence: 1.5,
        }];
        assert!(summarize_results(&generator, &out_of_range).await.is_err());
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn test_result_json_field_names() {
        let json = serde_json::to_string(&ClassificationResult {
            class_name: "cat".into(),
            confidence: 0.5,
        })
        .unwrap();
        assert_eq!(json, r#"{"className":"cat","confidence":0.5}"#);
    }
}
