//! Symptom journal models.

use serde::{Deserialize, Serialize};

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;

/// How a journal entry was created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SymptomSource {
    /// Entered by the patient on the journal screen
    Manual,
    /// Identified by the triage chat
    Triage,
}

impl SymptomSource {
    /// Stable lowercase name, shared by the database and the FFI surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomSource::Manual => "manual",
            SymptomSource::Triage => "triage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(SymptomSource::Manual),
            "triage" => Some(SymptomSource::Triage),
            _ => None,
        }
    }
}

/// A symptom journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomEntry {
    /// Local UUID
    pub entry_id: String,
    /// Symptom name (e.g., "baş ağrısı")
    pub name: String,
    /// Severity on a 1-5 scale
    pub severity: Option<u8>,
    /// Free-text note
    pub note: Option<String>,
    pub source: SymptomSource,
    /// Whether triage flagged this as urgent
    pub is_urgent: bool,
    /// Recording timestamp
    pub recorded_at: String,
}

impl SymptomEntry {
    /// Create a manual entry.
    pub fn new(name: String) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            name,
            severity: None,
            note: None,
            source: SymptomSource::Manual,
            is_urgent: false,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an entry from a triage result; the patient's message becomes the note.
    pub fn from_triage(name: String, is_urgent: bool, patient_text: &str) -> Self {
        Self {
            note: Some(patient_text.trim().to_string()).filter(|n| !n.is_empty()),
            source: SymptomSource::Triage,
            is_urgent,
            ..Self::new(name)
        }
    }

    /// Check field constraints before storing.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("symptom name cannot be empty".into());
        }
        if let Some(severity) = self.severity {
            if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
                return Err(format!(
                    "severity must be between {} and {}, got {}",
                    MIN_SEVERITY, MAX_SEVERITY, severity
                ));
            }
        }
        Ok(())
    }
}
