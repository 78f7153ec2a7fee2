//! Gemini `generateContent` HTTP client.

use serde::{Deserialize, Serialize};

use crate::client::TextGenerator;
use crate::config::TriageConfig;
use crate::error::{ProviderError, ProviderResult};

const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Blocking HTTP client for the Gemini text endpoint.
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Create a client from resolved configuration.
    pub fn new(config: &TriageConfig) -> ProviderResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint(),
            api_key: config.api_key().to_string(),
            client,
            timeout_secs: config.timeout.as_secs(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: *category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Response body from `generateContent`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the completion text out of a successful response body.
fn completion_text(body: &str) -> ProviderResult<String> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::MalformedBody(e.to_string()))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(match parsed.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => ProviderError::Blocked(reason),
            None => ProviderError::MalformedBody("no candidates in response".into()),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyCompletion);
    }
    Ok(text)
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ProviderError::Connection(e.to_string())
                } else {
                    ProviderError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::MalformedBody(e.to_string())
            }
        })?;

        if !status.is_success() {
            let error = ProviderError::from_status(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %error, "Gemini request failed");
            return Err(error);
        }

        let text = completion_text(&body)?;
        tracing::debug!(chars = text.chars().count(), "Gemini completion received");
        Ok(text)
    }
}
