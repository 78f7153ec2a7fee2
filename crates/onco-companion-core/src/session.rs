//! Triage chat session.
//!
//! Owns the visible transcript for one open chat and gates submissions:
//! empty input, a closed session and a request already in flight are refused
//! before anything is appended.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use onco_companion_llm::{SubmitRejected, TriageAdapter, TriageResponse};
use thiserror::Error;

use crate::models::{ConversationTurn, Transcript};

pub const URGENT_ALERT_TITLE: &str = "Acil Durum Uyarısı!";
pub const URGENT_ALERT_MESSAGE: &str =
    "Belirtileriniz acil olabilir. Lütfen derhal doktorunuzla iletişime geçin.";

/// Session errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("A reply is still pending")]
    Busy,

    #[error("Chat session is closed")]
    Closed,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SubmitRejected> for SessionError {
    fn from(e: SubmitRejected) -> Self {
        match e {
            SubmitRejected::EmptyInput => SessionError::EmptyInput,
            SubmitRejected::InFlight => SessionError::Busy,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for SessionError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        SessionError::LockPoisoned(e.to_string())
    }
}

/// Escalation notice the UI must show for an urgent reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgentAlert {
    pub title: String,
    pub message: String,
}

impl Default for UrgentAlert {
    fn default() -> Self {
        Self {
            title: URGENT_ALERT_TITLE.to_string(),
            message: URGENT_ALERT_MESSAGE.to_string(),
        }
    }
}

/// Result of one accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageOutcome {
    pub response: TriageResponse,
    /// Present whenever the reply is urgent; every urgent reply gets one.
    pub urgent_alert: Option<UrgentAlert>,
}

/// One open triage chat.
pub struct ChatSession {
    adapter: TriageAdapter,
    transcript: Mutex<Transcript>,
    closed: AtomicBool,
}

impl ChatSession {
    pub fn new(adapter: TriageAdapter) -> Self {
        Self {
            adapter,
            transcript: Mutex::new(Transcript::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Send a patient message and wait for the reply.
    ///
    /// Each accepted call appends exactly two turns: the patient message and
    /// the assistant reply (a fallback reply when the provider fails).
    pub fn submit(&self, patient_text: &str) -> SessionResult<TriageOutcome> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        if patient_text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let in_flight = self.adapter.begin()?;
        {
            // `close` flips the flag under this lock, so the check and the
            // push cannot straddle a teardown.
            let mut transcript = self.transcript.lock()?;
            if self.is_closed() {
                return Err(SessionError::Closed);
            }
            transcript.push(ConversationTurn::patient(patient_text));
        }

        let response = in_flight.run(patient_text, || !self.is_closed())?;

        {
            let mut transcript = self.transcript.lock()?;
            if self.is_closed() {
                tracing::debug!("Session closed while a reply was pending; reply dropped");
                return Err(SessionError::Closed);
            }
            transcript.push(ConversationTurn::assistant(response.response_text.clone()));
        }

        let urgent_alert = if response.is_urgent {
            tracing::warn!("Urgent symptom reported; escalation notice raised");
            Some(UrgentAlert::default())
        } else {
            None
        };

        Ok(TriageOutcome {
            response,
            urgent_alert,
        })
    }

    /// Snapshot of the visible transcript.
    pub fn transcript(&self) -> SessionResult<Vec<ConversationTurn>> {
        Ok(self.transcript.lock()?.turns().to_vec())
    }

    /// Whether a submission is currently awaiting its reply.
    pub fn is_busy(&self) -> bool {
        self.adapter.is_busy()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tear the chat down: clear the transcript and refuse further messages.
    pub fn close(&self) -> SessionResult<()> {
        let mut transcript = self.transcript.lock()?;
        self.closed.store(true, Ordering::Release);
        transcript.clear();
        tracing::info!("Chat session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onco_companion_llm::{MockGenerator, ProviderError, RetryPolicy};

    fn session_replying(text: &str) -> ChatSession {
        let adapter = TriageAdapter::new(
            Box::new(MockGenerator::replying(text)),
            RetryPolicy::immediate(1),
        );
        ChatSession::new(adapter)
    }

    #[test]
    fn test_submit_appends_two_turns() {
        let session = session_replying(r#"{"responseText":"Geçmiş olsun.","identifiedSymptom":null,"isUrgent":false}"#);
        let outcome = session.submit("Başım ağrıyor").unwrap();

        assert_eq!(outcome.response.response_text, "Geçmiş olsun.");
        assert!(outcome.urgent_alert.is_none());

        let turns = session.transcript().unwrap();
        assert_eq!(turns.len(), 2);
        assert!(turns[0].is_from_patient);
        assert_eq!(turns[0].text, "Başım ağrıyor");
        assert!(!turns[1].is_from_patient);
        assert_eq!(turns[1].text, "Geçmiş olsun.");
    }

    #[test]
    fn test_empty_input_adds_nothing() {
        let session = session_replying(r#"{"responseText":"x"}"#);
        assert_eq!(session.submit("  "), Err(SessionError::EmptyInput));
        assert!(session.transcript().unwrap().is_empty());
    }

    #[test]
    fn test_failure_still_adds_reply_turn() {
        let adapter = TriageAdapter::new(
            Box::new(MockGenerator::failing(ProviderError::Http("boom".into()))),
            RetryPolicy::immediate(1),
        );
        let session = ChatSession::new(adapter);
        let outcome = session.submit("Ateşim var").unwrap();

        let turns = session.transcript().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, outcome.response.response_text);
        assert!(!turns[1].text.is_empty());
    }

    #[test]
    fn test_urgent_reply_raises_alert() {
        let session = session_replying(r#"{"responseText":"Hemen doktora başvurun.","identifiedSymptom":"nefes darlığı","isUrgent":true}"#);
        let outcome = session.submit("Nefes alamıyorum").unwrap();
        assert_eq!(outcome.urgent_alert, Some(UrgentAlert::default()));
    }

    #[test]
    fn test_close_clears_and_refuses() {
        let session = session_replying(r#"{"responseText":"x"}"#);
        session.submit("merhaba").unwrap();
        session.close().unwrap();

        assert!(session.transcript().unwrap().is_empty());
        assert_eq!(session.submit("merhaba"), Err(SessionError::Closed));
    }

    #[test]
    fn test_rejections_map_to_session_errors() {
        assert_eq!(SessionError::from(SubmitRejected::InFlight), SessionError::Busy);
        assert_eq!(SessionError::from(SubmitRejected::EmptyInput), SessionError::EmptyInput);
    }
}
