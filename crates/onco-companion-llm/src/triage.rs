//! Symptom triage adapter.
//!
//! Turns one free-text patient message into a displayable [`TriageResponse`].
//! Provider and parsing failures never escape: each becomes a fallback reply.
//! The only rejections happen before any network call (empty input, or a
//! request already in flight).

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::client::TextGenerator;
use crate::config::TriageConfig;
use crate::error::{FailureKind, ProviderError, ProviderResult};
use crate::extraction::{parse_triage_reply, ParsedReply, TriageResponse};
use crate::gemini::GeminiClient;
use crate::prompts::build_full_prompt;

/// User-facing (Turkish) fallback wording.
pub mod messages {
    pub const FAILURE_PREFIX: &str = "Üzgünüm, bir hata oluştu.";
    pub const INVALID_CREDENTIAL: &str = "API anahtarı geçersiz.";
    pub const QUOTA_EXCEEDED: &str = "API kotası doldu.";
    pub const TRY_LATER: &str = "Lütfen daha sonra tekrar deneyin.";
    pub const COULD_NOT_PROCESS: &str = "Yanıt işlenemedi:";
    pub const EMPTY_COMPLETION: &str = "AI yanıtı boş geldi.";
}

/// Reasons a submission is refused before reaching the provider.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("patient text is empty")]
    EmptyInput,

    #[error("a triage request is already in flight")]
    InFlight,
}

/// Retry behaviour for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts (tests).
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::ZERO,
        }
    }
}

/// Adapter between patient text and a text-generation backend.
pub struct TriageAdapter {
    generator: Box<dyn TextGenerator>,
    retry: RetryPolicy,
    include_examples: bool,
    in_flight: AtomicBool,
}

/// Exclusive right to run one triage request on an adapter.
///
/// Obtained from [`TriageAdapter::begin`]; the adapter is free again once
/// this is dropped.
pub struct InFlight<'a> {
    adapter: &'a TriageAdapter,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.adapter.in_flight.store(false, Ordering::Release);
    }
}

impl InFlight<'_> {
    /// Run the request. Retries stop as soon as `keep_going` returns false.
    pub fn run<F>(self, patient_text: &str, keep_going: F) -> Result<TriageResponse, SubmitRejected>
    where
        F: Fn() -> bool,
    {
        if patient_text.trim().is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }
        let adapter = self.adapter;

        tracing::info!(chars = patient_text.chars().count(), "Triage request started");
        let prompt = build_full_prompt(patient_text, adapter.include_examples);

        let response = match adapter.generate_with_retry(&prompt, &keep_going) {
            Ok(raw) => adapter.interpret(raw),
            Err(e) => {
                tracing::warn!(error = %e, "Triage provider failed, using fallback reply");
                provider_fallback(&e)
            }
        };

        tracing::info!(
            urgent = response.is_urgent,
            symptom = response.identified_symptom.is_some(),
            "Triage request finished"
        );
        Ok(response)
    }
}

impl TriageAdapter {
    pub fn new(generator: Box<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self {
            generator,
            retry,
            include_examples: false,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Adapter backed by the Gemini HTTP client.
    pub fn from_config(config: &TriageConfig) -> ProviderResult<Self> {
        let client = GeminiClient::new(config)?;
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
        };
        Ok(Self::new(Box::new(client), retry).with_examples(config.include_examples))
    }

    pub fn with_examples(mut self, include_examples: bool) -> Self {
        self.include_examples = include_examples;
        self
    }

    /// Whether a request is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the adapter for one request.
    pub fn begin(&self) -> Result<InFlight<'_>, SubmitRejected> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight { adapter: self })
            .map_err(|_| SubmitRejected::InFlight)
    }

    /// Triage one patient message.
    pub fn analyze(&self, patient_text: &str) -> Result<TriageResponse, SubmitRejected> {
        self.analyze_while(patient_text, || true)
    }

    /// Like [`analyze`](Self::analyze), but retries only while `keep_going` holds.
    pub fn analyze_while<F>(&self, patient_text: &str, keep_going: F) -> Result<TriageResponse, SubmitRejected>
    where
        F: Fn() -> bool,
    {
        if patient_text.trim().is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }
        self.begin()?.run(patient_text, keep_going)
    }

    fn generate_with_retry<F>(&self, prompt: &str, keep_going: &F) -> ProviderResult<String>
    where
        F: Fn() -> bool,
    {
        let mut attempt = 0;
        loop {
            match self.generator.generate(prompt) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries && keep_going() => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %e, "Transient provider failure, retrying");
                    if !self.retry.backoff.is_zero() {
                        thread::sleep(self.retry.backoff);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn interpret(&self, raw: String) -> TriageResponse {
        match parse_triage_reply(&raw) {
            ParsedReply::Valid(response) => response,
            ParsedReply::ParseFailure { raw, reason } => {
                tracing::warn!(%reason, "Model reply did not match the triage contract");
                parse_fallback(&raw)
            }
        }
    }
}

/// Fallback for a provider failure, worded by failure class.
pub fn provider_fallback(error: &ProviderError) -> TriageResponse {
    let detail = match (error.kind(), error) {
        (FailureKind::Credential, _) => messages::INVALID_CREDENTIAL.to_string(),
        (FailureKind::Quota, _) => messages::QUOTA_EXCEEDED.to_string(),
        (FailureKind::Generic, ProviderError::EmptyCompletion) => messages::EMPTY_COMPLETION.to_string(),
        (FailureKind::Generic, ProviderError::Status { message, .. }) => {
            format!("{}\n\nDetay: {}", messages::TRY_LATER, message)
        }
        (FailureKind::Generic, other) => format!("{}\n\nDetay: {}", messages::TRY_LATER, other),
    };
    TriageResponse::fallback(format!("{} {}", messages::FAILURE_PREFIX, detail))
}

/// Fallback for a reply that failed validation; echoes the raw text.
pub fn parse_fallback(raw: &str) -> TriageResponse {
    let raw = raw.trim();
    let text = if raw.is_empty() {
        format!("{} {}", messages::FAILURE_PREFIX, messages::EMPTY_COMPLETION)
    } else {
        format!("{} {}", messages::COULD_NOT_PROCESS, raw)
    };
    TriageResponse::fallback(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockGenerator;
    use std::sync::Arc;

    fn adapter(mock: MockGenerator) -> (TriageAdapter, Arc<MockGenerator>) {
        let mock = Arc::new(mock);
        let adapter = TriageAdapter::new(Box::new(mock.clone()), RetryPolicy::immediate(1));
        (adapter, mock)
    }

    #[test]
    fn test_well_formed_reply_passes_through() {
        let (adapter, _) = adapter(MockGenerator::replying(
            r#"{"responseText":"Geçmiş olsun.","identifiedSymptom":"yorgunluk","isUrgent":false}"#,
        ));
        let reply = adapter.analyze("Çok yorgunum").unwrap();
        assert_eq!(reply.response_text, "Geçmiş olsun.");
        assert_eq!(reply.identified_symptom.as_deref(), Some("yorgunluk"));
        assert!(!reply.is_urgent);
    }

    #[test]
    fn test_prompt_contains_patient_text() {
        let (adapter, mock) = adapter(MockGenerator::replying(r#"{"responseText":"x"}"#));
        adapter.analyze("Midem bulanıyor").unwrap();
        assert!(mock.prompts()[0].contains("Midem bulanıyor"));
    }

    #[test]
    fn test_empty_input_never_calls_provider() {
        let (adapter, mock) = adapter(MockGenerator::replying("unused"));
        assert_eq!(adapter.analyze("   \n"), Err(SubmitRejected::EmptyInput));
        assert_eq!(mock.calls(), 0);
        assert!(!adapter.is_busy());
    }

    #[test]
    fn test_in_flight_guard_rejects_second_request() {
        let (adapter, _) = adapter(MockGenerator::replying(r#"{"responseText":"x"}"#));
        let guard = adapter.begin().unwrap();
        assert!(adapter.is_busy());
        assert_eq!(adapter.analyze("merhaba"), Err(SubmitRejected::InFlight));
        drop(guard);
        assert!(adapter.analyze("merhaba").is_ok());
    }

    #[test]
    fn test_single_retry_on_transient_failure() {
        let (adapter, mock) = adapter(MockGenerator::new(vec![
            Err(ProviderError::Timeout(15)),
            Ok(r#"{"responseText":"İkinci deneme","isUrgent":false}"#.into()),
        ]));
        let reply = adapter.analyze("ağrım var").unwrap();
        assert_eq!(reply.response_text, "İkinci deneme");
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_retry_is_bounded() {
        let (adapter, mock) = adapter(MockGenerator::failing(ProviderError::Connection("refused".into())));
        let reply = adapter.analyze("ağrım var").unwrap();
        assert_eq!(mock.calls(), 2);
        assert!(reply.response_text.starts_with(messages::FAILURE_PREFIX));
        assert!(!reply.is_urgent);
    }

    #[test]
    fn test_no_retry_on_credential_failure() {
        let (adapter, mock) = adapter(MockGenerator::failing(ProviderError::Auth {
            status: 400,
            message: "API key not valid".into(),
        }));
        let reply = adapter.analyze("ağrım var").unwrap();
        assert_eq!(mock.calls(), 1);
        assert!(reply.response_text.contains(messages::INVALID_CREDENTIAL));
    }

    #[test]
    fn test_no_retry_when_stopped() {
        let (adapter, mock) = adapter(MockGenerator::failing(ProviderError::Timeout(15)));
        adapter.analyze_while("ağrım var", || false).unwrap();
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn test_quota_fallback() {
        let reply = provider_fallback(&ProviderError::Quota {
            status: 429,
            message: "quota".into(),
        });
        assert!(reply.response_text.contains(messages::QUOTA_EXCEEDED));
        assert_eq!(reply.identified_symptom, None);
    }

    #[test]
    fn test_status_fallback_uses_provider_message() {
        let reply = provider_fallback(&ProviderError::Status {
            status: 500,
            message: "Internal error encountered.".into(),
        });
        assert!(reply.response_text.contains("Internal error encountered."));
    }

    #[test]
    fn test_parse_fallback_embeds_raw() {
        let reply = parse_fallback("Üzgünüm anlayamadım");
        assert_eq!(reply.response_text, "Yanıt işlenemedi: Üzgünüm anlayamadım");
        assert!(!reply.is_urgent);
    }

    #[test]
    fn test_guard_released_after_fallback() {
        let (adapter, _) = adapter(MockGenerator::replying("düz metin"));
        adapter.analyze("a").unwrap();
        assert!(!adapter.is_busy());
    }
}
