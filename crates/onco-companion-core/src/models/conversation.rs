//! Chat transcript models.

use serde::{Deserialize, Serialize};

/// One visible message in the triage chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Message text as displayed
    pub text: String,
    /// True for patient messages, false for assistant replies
    pub is_from_patient: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl ConversationTurn {
    pub fn patient(text: impl Into<String>) -> Self {
        Self::new(text.into(), true)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text.into(), false)
    }

    fn new(text: String, is_from_patient: bool) -> Self {
        Self {
            text,
            is_from_patient,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only, ordered transcript of a chat session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Existing turns are never modified.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent assistant reply, if any.
    pub fn last_reply(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| !t.is_from_patient)
    }

    /// Drop every turn (session teardown only).
    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        assert!(ConversationTurn::patient("merhaba").is_from_patient);
        assert!(!ConversationTurn::assistant("merhaba").is_from_patient);
    }

    #[test]
    fn test_transcript_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(ConversationTurn::patient("1"));
        transcript.push(ConversationTurn::assistant("2"));
        transcript.push(ConversationTurn::patient("3"));

        let texts: Vec<&str> = transcript.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert_eq!(transcript.last_reply().unwrap().text, "2");
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::new();
        transcript.push(ConversationTurn::patient("1"));
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(transcript.last_reply().is_none());
    }
}
