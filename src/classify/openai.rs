//! Ad classification via an OpenAI-compatible chat completions API.

use crate::classify::{parse_ad_intervals, render_segments, AdClassifier};
use crate::error::{AdtrimError, Result};
use crate::timeline::TimeInterval;
use crate::transcribe::TranscriptSegment;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed instruction prompt. Requests the timestamps as a chronological
/// JSON array so the response can be extracted mechanically.
const SYSTEM_PROMPT: &str = "From this podcast transcript, give me the exact timestamps of the \
ad segments. For each ad segment, give me an opening timestamp, and an ending timestamp. You can \
reason and think step by step, but then make sure to output the exact timestamps in chronological \
order, in an array of curly braces. For example \
[{\"start\": 0.0, \"end\": 10.0}, {\"start\": 20.0, \"end\": 30.0}].";

/// Classifier backed by an OpenAI-style `/v1/chat/completions` endpoint.
pub struct OpenAiClassifier {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiClassifier {
    /// Create a new classifier with the given API key and endpoint.
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
            model: "gpt-4o".to_string(),
        }
    }

    /// Set a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Truncate to at most `max` bytes without splitting a multibyte character.
fn truncate_for_log(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ChatError>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatError {
    message: String,
}

#[async_trait]
impl AdClassifier for OpenAiClassifier {
    async fn classify(&self, segments: &[TranscriptSegment]) -> Result<Vec<TimeInterval>> {
        if segments.is_empty() {
            warn!("Empty transcript given to classifier; reporting no ads");
            return Ok(vec![]);
        }

        debug!("Classifying {} transcript segments", segments.len());

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: render_segments(segments),
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AdtrimError::Transport(format!(
                "classifier API error ({}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)?;

        if let Some(error) = chat_response.error {
            return Err(AdtrimError::MalformedClassifierOutput(format!(
                "classifier error: {}",
                error.message
            )));
        }

        let choice = chat_response
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| {
                AdtrimError::MalformedClassifierOutput("response had no choices".to_string())
            })?;

        if let Some(reason) = choice.finish_reason.as_deref() {
            if reason != "stop" {
                return Err(AdtrimError::MalformedClassifierOutput(format!(
                    "classifier stopped early (finish_reason: {reason})"
                )));
            }
        }

        let content = choice
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| {
                AdtrimError::MalformedClassifierOutput("response had no message content".to_string())
            })?;

        debug!("Classifier response: {}", truncate_for_log(&content, 500));

        parse_ad_intervals(&content)
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_creation() {
        let classifier = OpenAiClassifier::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1/chat/completions".to_string(),
        );
        assert_eq!(classifier.name(), "OpenAI");
        assert_eq!(classifier.model, "gpt-4o");
    }

    #[test]
    fn test_with_model() {
        let classifier = OpenAiClassifier::new("sk-test".to_string(), "http://x".to_string())
            .with_model("gpt-4o-mini");
        assert_eq!(classifier.model, "gpt-4o-mini");
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{
            "choices": [{
                "message": {"content": "[{\"start\": 1.0, \"end\": 2.0}]"},
                "finish_reason": "stop"
            }]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let choice = parsed.choices.unwrap().into_iter().next().unwrap();
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert!(choice.message.unwrap().content.unwrap().contains("start"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // Multibyte character straddling the cut point must not split.
        let mut content = "a".repeat(499);
        content.push('é');
        content.push_str(&"b".repeat(29));
        let truncated = truncate_for_log(&content, 500);
        assert_eq!(truncated.len(), 499);
        assert!(truncated.chars().all(|c| c == 'a'));

        assert_eq!(truncate_for_log("short", 500), "short");
        assert_eq!(truncate_for_log("héllo", 2), "h");
    }

    #[test]
    fn test_system_prompt_requests_json_array() {
        assert!(SYSTEM_PROMPT.contains("chronological"));
        assert!(SYSTEM_PROMPT.contains("{\"start\": 0.0, \"end\": 10.0}"));
    }

    #[tokio::test]
    async fn test_empty_transcript_yields_no_ads() {
        let classifier = OpenAiClassifier::new("sk-test".to_string(), "http://x".to_string());
        let intervals = classifier.classify(&[]).await.unwrap();
        assert!(intervals.is_empty());
    }
}
