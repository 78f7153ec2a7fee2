//! Symptom triage over a generative-language model.
//!
//! This crate turns a patient's free-text message into a structured
//! [`TriageResponse`] using Gemini `generateContent`, with strict validation of
//! the model's JSON reply and a displayable fallback for every failure.

pub mod client;
pub mod config;
pub mod error;
pub mod extraction;
pub mod gemini;
pub mod prompts;
pub mod triage;

pub use client::{MockGenerator, TextGenerator};
pub use config::{ConfigError, TriageConfig};
pub use error::{FailureKind, ProviderError, ProviderResult};
pub use extraction::{parse_triage_reply, strip_code_fences, ParseFailureReason, ParsedReply, TriageResponse};
pub use gemini::GeminiClient;
pub use prompts::*;
pub use triage::{InFlight, RetryPolicy, SubmitRejected, TriageAdapter};
