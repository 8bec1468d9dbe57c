//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use landing_kit_core::config::GeminiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompt::PromptPair;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation service is not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Generation service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Generation blocked: {0}")]
    Blocked(String),

    #[error("Generation service returned no text")]
    Empty,

    #[error("Failed to decode generation response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

/// One call to a text-generation service: prompts in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompts: &PromptPair) -> Result<String, GenerationError>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

impl GeminiClient {
    /// Create a client from configuration. Fails when no API key is set.
    pub fn new(config: &GeminiConfig, timeout: Duration) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::NotConfigured("GEMINI_API_KEY is not set".into()))?;

        let client = Client::builder().timeout(timeout).build()?;

        tracing::debug!(model = %config.model, "Gemini client ready");

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompts: &PromptPair) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompts.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &prompts.user,
                }],
            }],
        };

        tracing::info!(model = %self.model, prompt_bytes = prompts.user.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let text = extract_text(&body)?;
        tracing::info!(model = %self.model, text_bytes = text.len(), "Gemini responded");
        Ok(text)
    }
}

/// Pull the message out of a Google error body, or fall back to the raw body.
fn upstream_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Decode(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => GenerationError::Blocked(reason),
            None => GenerationError::Empty,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason {
        Some(reason) if reason != "STOP" => Err(GenerationError::Blocked(reason)),
        _ => Err(GenerationError::Empty),
    }
}
