//! Onco Companion Core Library
//!
//! Local-first core of a symptom-tracking app for cancer patients, linked into
//! the mobile shell through UniFFI.
//!
//! # Architecture
//!
//! ```text
//! Patient message ──► ChatSession ──► TriageAdapter ──► Gemini
//!                        │                 │
//!                        │        fence strip + contract check
//!                        │                 │
//!                        ◄──── TriageResponse (or fallback reply)
//!                        │
//!          ┌─────────────┼──────────────────┐
//!          ▼             ▼                  ▼
//!     Transcript   Urgent alert     Symptom journal (SQLite)
//!
//! Drug catalog search ──► Medication log (SQLite)
//! ```
//!
//! # Core Principle
//!
//! **Every accepted message gets a displayable reply.** Provider and parsing
//! failures become fallback text; they never surface as errors.
//!
//! # Modules
//!
//! - [`db`]: SQLite symptom journal, medication log and drug catalog
//! - [`models`]: Domain types (ConversationTurn, SymptomEntry, MedicationEntry, etc.)
//! - [`session`]: Chat session with transcript and urgency escalation

pub mod db;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use db::Database;
pub use models::{
    ConversationTurn, DrugCatalogItem, MedicationEntry, SymptomEntry, SymptomSource, Transcript,
};
pub use onco_companion_llm::{TriageConfig, TriageResponse};
pub use session::{ChatSession, SessionError, TriageOutcome, UrgentAlert};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};
use std::time::Duration;

use onco_companion_llm::TriageAdapter;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum OncoCompanionError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Chat busy: {0}")]
    Busy(String),

    #[error("Chat closed: {0}")]
    Closed(String),
}

impl From<db::DbError> for OncoCompanionError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Constraint(msg) => OncoCompanionError::InvalidInput(msg),
            other => OncoCompanionError::DatabaseError(other.to_string()),
        }
    }
}

impl From<SessionError> for OncoCompanionError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::EmptyInput => OncoCompanionError::InvalidInput(e.to_string()),
            SessionError::Busy => OncoCompanionError::Busy(e.to_string()),
            SessionError::Closed => OncoCompanionError::Closed(e.to_string()),
            SessionError::LockPoisoned(_) => OncoCompanionError::DatabaseError(e.to_string()),
        }
    }
}

impl From<onco_companion_llm::ConfigError> for OncoCompanionError {
    fn from(e: onco_companion_llm::ConfigError) -> Self {
        OncoCompanionError::ConfigError(e.to_string())
    }
}

impl From<onco_companion_llm::ProviderError> for OncoCompanionError {
    fn from(e: onco_companion_llm::ProviderError) -> Self {
        OncoCompanionError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for OncoCompanionError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        OncoCompanionError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create the journal database at the given path.
#[uniffi::export]
pub fn open_companion(
    path: String,
    config: FfiTriageConfig,
) -> Result<Arc<OncoCompanion>, OncoCompanionError> {
    let db = Database::open(&path)?;
    let adapter = TriageAdapter::from_config(&config.try_into()?)?;
    Ok(Arc::new(OncoCompanion::new(db, adapter)))
}

/// Create an in-memory journal (for testing).
#[uniffi::export]
pub fn open_companion_in_memory(
    config: FfiTriageConfig,
) -> Result<Arc<OncoCompanion>, OncoCompanionError> {
    let db = Database::open_in_memory()?;
    let adapter = TriageAdapter::from_config(&config.try_into()?)?;
    Ok(Arc::new(OncoCompanion::new(db, adapter)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe core object for FFI.
#[derive(uniffi::Object)]
pub struct OncoCompanion {
    db: Arc<Mutex<Database>>,
    session: ChatSession,
}

impl OncoCompanion {
    /// Build from parts; lets Rust callers inject any text generator.
    pub fn new(db: Database, adapter: TriageAdapter) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            session: ChatSession::new(adapter),
        }
    }
}

#[uniffi::export]
impl OncoCompanion {
    // =========================================================================
    // Chat Operations
    // =========================================================================

    /// Send a chat message; blocks until the reply (or fallback) is ready.
    ///
    /// An identified symptom is also written to the journal.
    pub fn send_message(&self, text: String) -> Result<FfiTriageResult, OncoCompanionError> {
        let outcome = self.session.submit(&text)?;

        // The reply is already in the transcript; journaling is best-effort.
        match self.db.lock() {
            Ok(db) => {
                if let Err(e) = db.record_from_triage(&outcome.response, &text) {
                    tracing::warn!(error = %e, "Failed to journal triage symptom");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Journal unavailable; triage symptom not recorded"),
        }

        Ok(outcome.into())
    }

    /// Visible chat transcript, oldest first.
    pub fn transcript(&self) -> Result<Vec<FfiConversationTurn>, OncoCompanionError> {
        let turns = self.session.transcript()?;
        Ok(turns.into_iter().map(|t| t.into()).collect())
    }

    /// Whether a message is still awaiting its reply.
    pub fn is_chat_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Close the chat: clears the transcript and refuses further messages.
    pub fn close_chat(&self) -> Result<(), OncoCompanionError> {
        Ok(self.session.close()?)
    }

    // =========================================================================
    // Symptom Journal Operations
    // =========================================================================

    /// Record a symptom entered by the patient.
    pub fn record_symptom(
        &self,
        name: String,
        severity: Option<u8>,
        note: Option<String>,
    ) -> Result<FfiSymptomEntry, OncoCompanionError> {
        let db = self.db.lock()?;
        let mut entry = SymptomEntry::new(name);
        entry.severity = severity;
        entry.note = note.filter(|n| !n.trim().is_empty());
        db.insert_symptom(&entry)?;
        Ok(entry.into())
    }

    /// List journal entries, newest first.
    pub fn list_symptoms(&self, limit: u32) -> Result<Vec<FfiSymptomEntry>, OncoCompanionError> {
        let db = self.db.lock()?;
        let entries = db.list_symptoms(limit as usize)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// List entries triage flagged as urgent, newest first.
    pub fn list_urgent_symptoms(&self) -> Result<Vec<FfiSymptomEntry>, OncoCompanionError> {
        let db = self.db.lock()?;
        let entries = db.list_urgent_symptoms()?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Delete a journal entry. Returns false if it did not exist.
    pub fn delete_symptom(&self, entry_id: String) -> Result<bool, OncoCompanionError> {
        let db = self.db.lock()?;
        Ok(db.delete_symptom(&entry_id)?)
    }

    /// Export the journal as JSON (for the report screen).
    pub fn export_symptoms_json(&self) -> Result<String, OncoCompanionError> {
        let db = self.db.lock()?;
        let entries = db.list_symptoms(u32::MAX as usize)?;
        serde_json::to_string_pretty(&entries)
            .map_err(|e| OncoCompanionError::DatabaseError(e.to_string()))
    }
}

#[uniffi::export]
impl OncoCompanion {
    // =========================================================================
    // Medication Operations
    // =========================================================================

    /// Load the bundled drug catalog (JSON array export). Replaces any previous catalog.
    pub fn import_drug_catalog(&self, json: String) -> Result<u32, OncoCompanionError> {
        let db = self.db.lock()?;
        let count = db.import_drug_catalog(&json)?;
        Ok(count as u32)
    }

    /// Autocomplete over catalog product names.
    pub fn search_drugs(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiDrugCatalogItem>, OncoCompanionError> {
        let db = self.db.lock()?;
        let items = db.search_drug_catalog(&query, limit as usize)?;
        Ok(items.into_iter().map(|i| i.into()).collect())
    }

    /// Add a medication to the patient's list.
    pub fn record_medication(
        &self,
        name: String,
        dose: String,
        time: String,
        active_ingredient: Option<String>,
    ) -> Result<FfiMedicationEntry, OncoCompanionError> {
        let db = self.db.lock()?;
        let mut entry = MedicationEntry::new(name, dose, time);
        entry.active_ingredient = active_ingredient.filter(|a| !a.trim().is_empty());
        db.insert_medication(&entry)?;
        Ok(entry.into())
    }

    /// The patient's medications, in the order added.
    pub fn list_medications(&self) -> Result<Vec<FfiMedicationEntry>, OncoCompanionError> {
        let db = self.db.lock()?;
        let entries = db.list_medications()?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Remove a medication. Returns false if it did not exist.
    pub fn delete_medication(&self, entry_id: String) -> Result<bool, OncoCompanionError> {
        let db = self.db.lock()?;
        Ok(db.delete_medication(&entry_id)?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe triage configuration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTriageConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl TryFrom<FfiTriageConfig> for TriageConfig {
    type Error = OncoCompanionError;

    fn try_from(ffi: FfiTriageConfig) -> Result<Self, Self::Error> {
        let mut config = TriageConfig::new(ffi.api_key)?;
        if let Some(model) = ffi.model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(base_url) = ffi.base_url.filter(|u| !u.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(secs) = ffi.timeout_secs {
            if secs == 0 {
                return Err(OncoCompanionError::ConfigError(
                    "timeout_secs must be at least 1".into(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// FFI-safe triage result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTriageResult {
    pub response_text: String,
    pub identified_symptom: Option<String>,
    pub is_urgent: bool,
    pub urgent_alert_title: Option<String>,
    pub urgent_alert_message: Option<String>,
}

impl From<TriageOutcome> for FfiTriageResult {
    fn from(outcome: TriageOutcome) -> Self {
        let (urgent_alert_title, urgent_alert_message) = match outcome.urgent_alert {
            Some(alert) => (Some(alert.title), Some(alert.message)),
            None => (None, None),
        };
        Self {
            response_text: outcome.response.response_text,
            identified_symptom: outcome.response.identified_symptom,
            is_urgent: outcome.response.is_urgent,
            urgent_alert_title,
            urgent_alert_message,
        }
    }
}

/// FFI-safe transcript turn.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConversationTurn {
    pub text: String,
    pub is_from_patient: bool,
    pub created_at: String,
}

impl From<ConversationTurn> for FfiConversationTurn {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            text: turn.text,
            is_from_patient: turn.is_from_patient,
            created_at: turn.created_at,
        }
    }
}

/// FFI-safe symptom entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSymptomEntry {
    pub entry_id: String,
    pub name: String,
    pub severity: Option<u8>,
    pub note: Option<String>,
    pub source: String,
    pub is_urgent: bool,
    pub recorded_at: String,
}

impl From<SymptomEntry> for FfiSymptomEntry {
    fn from(entry: SymptomEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            name: entry.name,
            severity: entry.severity,
            note: entry.note,
            source: entry.source.as_str().to_string(),
            is_urgent: entry.is_urgent,
            recorded_at: entry.recorded_at,
        }
    }
}

/// FFI-safe drug catalog item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugCatalogItem {
    pub barcode: Option<String>,
    pub name: String,
    pub active_ingredient: Option<String>,
    pub dose_amount: Option<String>,
}

impl From<DrugCatalogItem> for FfiDrugCatalogItem {
    fn from(item: DrugCatalogItem) -> Self {
        Self {
            barcode: item.barcode,
            name: item.name,
            active_ingredient: item.active_ingredient,
            dose_amount: item.dose_amount,
        }
    }
}

/// FFI-safe medication entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationEntry {
    pub entry_id: String,
    pub name: String,
    pub dose: String,
    pub time: String,
    pub active_ingredient: Option<String>,
    pub recorded_at: String,
}

impl From<MedicationEntry> for FfiMedicationEntry {
    fn from(entry: MedicationEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            name: entry.name,
            dose: entry.dose,
            time: entry.time,
            active_ingredient: entry.active_ingredient,
            recorded_at: entry.recorded_at,
        }
    }
}
