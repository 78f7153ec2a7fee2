//! Provider failure taxonomy.

use serde::Deserialize;
use thiserror::Error;

/// Errors from a text-generation provider.
///
/// None of these reach the patient as an error: the triage adapter turns every
/// variant into a displayable fallback reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot reach provider: {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Invalid credentials (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Quota exceeded (HTTP {status}): {message}")]
    Quota { status: u16, message: String },

    #[error("Provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Prompt blocked by provider: {0}")]
    Blocked(String),

    #[error("Malformed provider body: {0}")]
    MalformedBody(String),

    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Coarse failure class used to pick the fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Credential,
    Quota,
    Generic,
}

impl ProviderError {
    /// Whether a single retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Connection(_) => true,
            ProviderError::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Auth { .. } => FailureKind::Credential,
            ProviderError::Quota { .. } => FailureKind::Quota,
            _ => FailureKind::Generic,
        }
    }

    /// Classify a non-success response from its status code and raw body.
    ///
    /// Google-style bodies (`{"error":{"message":..,"status":..}}`) supply the
    /// message; anything else falls back to the raw body text.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error);

        let (message, provider_status) = match parsed {
            Some(detail) => (
                detail.message.unwrap_or_else(|| body.trim().to_string()),
                detail.status.unwrap_or_default(),
            ),
            None => (body.trim().to_string(), String::new()),
        };
        let message = if message.is_empty() {
            format!("HTTP {}", status)
        } else {
            message
        };

        let lowered = message.to_lowercase();
        if status == 401
            || status == 403
            || provider_status == "UNAUTHENTICATED"
            || provider_status == "PERMISSION_DENIED"
            || lowered.contains("api key not valid")
            || lowered.contains("api_key_invalid")
        {
            ProviderError::Auth { status, message }
        } else if status == 429 || provider_status == "RESOURCE_EXHAUSTED" || lowered.contains("quota") {
            ProviderError::Quota { status, message }
        } else {
            ProviderError::Status { status, message }
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    status: Option<String>,
}
