//! Triage reply extraction from LLM output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured triage result shown to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResponse {
    /// Empathetic reply; never empty.
    pub response_text: String,
    /// Primary symptom, if the model named one.
    pub identified_symptom: Option<String>,
    /// Binary urgency gate.
    pub is_urgent: bool,
}

impl TriageResponse {
    /// Non-urgent reply with no symptom, used for every fallback path.
    pub fn fallback(response_text: String) -> Self {
        Self {
            response_text,
            identified_symptom: None,
            is_urgent: false,
        }
    }
}

/// Why a model reply did not satisfy the three-field contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailureReason {
    #[error("reply is empty")]
    Empty,

    #[error("reply is not JSON: {0}")]
    NotJson(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("responseText is missing or empty")]
    MissingResponseText,
}

/// Outcome of validating a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Valid(TriageResponse),
    ParseFailure {
        raw: String,
        reason: ParseFailureReason,
    },
}

impl ParsedReply {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedReply::Valid(_))
    }
}

const FENCE: &str = "```";

/// Remove markdown code fences wrapped around a payload.
///
/// Repeats until nothing changes, so the result is a fixed point and
/// already-unfenced JSON comes back untouched.
pub fn strip_code_fences(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let next = strip_one_fence_layer(current);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

fn strip_one_fence_layer(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(after_open) = body.strip_prefix(FENCE) {
        // Only the language tag (`json`, `JSON`, ...) goes; a payload may
        // start on the fence line itself.
        body = after_open
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start();
    }

    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Validate model output against the `responseText`/`identifiedSymptom`/`isUrgent` contract.
pub fn parse_triage_reply(raw: &str) -> ParsedReply {
    let failure = |reason| ParsedReply::ParseFailure {
        raw: raw.to_string(),
        reason,
    };

    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return failure(ParseFailureReason::Empty);
    }

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => return failure(ParseFailureReason::NotJson(e.to_string())),
    };

    let Some(object) = value.as_object() else {
        return failure(ParseFailureReason::NotAnObject);
    };

    let response_text = match object.get("responseText").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => return failure(ParseFailureReason::MissingResponseText),
    };

    let identified_symptom = match object.get("identifiedSymptom") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        None | Some(Value::Null) | Some(Value::String(_)) => None,
        Some(other) => {
            tracing::debug!(kind = json_kind(other), "Ignoring non-string identifiedSymptom");
            None
        }
    };

    let is_urgent = object.get("isUrgent").map(is_truthy).unwrap_or(false);

    ParsedReply::Valid(TriageResponse {
        response_text,
        identified_symptom,
        is_urgent,
    })
}

/// Truthiness of the urgency flag; any non-empty string escalates.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"responseText":"Geçmiş olsun.","identifiedSymptom":"baş ağrısı","isUrgent":false}"#;
        let parsed = parse_triage_reply(raw);
        assert_eq!(
            parsed,
            ParsedReply::Valid(TriageResponse {
                response_text: "Geçmiş olsun.".into(),
                identified_symptom: Some("baş ağrısı".into()),
                is_urgent: false,
            })
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"responseText\":\"Geçmiş olsun.\",\"identifiedSymptom\":null,\"isUrgent\":false}\n```";
        match parse_triage_reply(raw) {
            ParsedReply::Valid(reply) => {
                assert_eq!(reply.response_text, "Geçmiş olsun.");
                assert_eq!(reply.identified_symptom, None);
                assert!(!reply.is_urgent);
            }
            other => panic!("expected valid reply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_line_fence() {
        let raw = r#"```json {"responseText":"Tamam","isUrgent":true}```"#;
        let parsed = parse_triage_reply(raw);
        assert!(matches!(parsed, ParsedReply::Valid(ref r) if r.is_urgent));
    }

    #[test]
    fn test_missing_response_text_fails() {
        let raw = r#"{"identifiedSymptom":"ateş","isUrgent":true}"#;
        assert_eq!(
            parse_triage_reply(raw),
            ParsedReply::ParseFailure {
                raw: raw.into(),
                reason: ParseFailureReason::MissingResponseText,
            }
        );
    }

    #[test]
    fn test_blank_response_text_fails() {
        let raw = r#"{"responseText":"   ","identifiedSymptom":null,"isUrgent":false}"#;
        assert!(!parse_triage_reply(raw).is_valid());
    }

    #[test]
    fn test_prose_fails_and_keeps_raw() {
        match parse_triage_reply("Üzgünüm anlayamadım") {
            ParsedReply::ParseFailure { raw, reason } => {
                assert_eq!(raw, "Üzgünüm anlayamadım");
                assert!(matches!(reason, ParseFailureReason::NotJson(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_fails() {
        let parsed = parse_triage_reply(r#"["responseText"]"#);
        assert!(matches!(
            parsed,
            ParsedReply::ParseFailure { reason: ParseFailureReason::NotAnObject, .. }
        ));
    }

    #[test]
    fn test_empty_after_fences_fails() {
        let parsed = parse_triage_reply("```json\n```");
        assert!(matches!(
            parsed,
            ParsedReply::ParseFailure { reason: ParseFailureReason::Empty, .. }
        ));
    }

    #[test]
    fn test_urgency_truthiness() {
        let urgent = |flag: &str| {
            let raw = format!(r#"{{"responseText":"x","isUrgent":{}}}"#, flag);
            match parse_triage_reply(&raw) {
                ParsedReply::Valid(r) => r.is_urgent,
                other => panic!("expected valid reply, got {:?}", other),
            }
        };
        assert!(urgent("true"));
        assert!(urgent("1"));
        assert!(urgent(r#""true""#));
        assert!(urgent(r#""evet""#));
        assert!(!urgent("false"));
        assert!(!urgent("0"));
        assert!(!urgent("null"));
        assert!(!urgent(r#""""#));
    }

    #[test]
    fn test_any_non_empty_string_is_urgent() {
        for flag in ["false", "no", "hayır", "0", " "] {
            let raw = format!(r#"{{"responseText":"x","isUrgent":"{}"}}"#, flag);
            assert!(
                matches!(parse_triage_reply(&raw), ParsedReply::Valid(ref r) if r.is_urgent),
                "isUrgent {:?} should escalate",
                flag
            );
        }
    }

    #[test]
    fn test_fence_without_tag_keeps_payload_on_fence_line() {
        let raw = "```{\"responseText\":\"Geçmiş olsun.\",\n\"identifiedSymptom\":null,\"isUrgent\":false}\n```";
        match parse_triage_reply(raw) {
            ParsedReply::Valid(reply) => {
                assert_eq!(reply.response_text, "Geçmiş olsun.");
                assert_eq!(reply.identified_symptom, None);
                assert!(!reply.is_urgent);
            }
            other => panic!("expected valid reply, got {:?}", other),
        }
    }

    #[test]
    fn test_tagged_fence_multiline_keeps_urgency() {
        let raw = "```json {\"responseText\":\"Tamam\",\n\"isUrgent\":true}\n```";
        match parse_triage_reply(raw) {
            ParsedReply::Valid(reply) => {
                assert_eq!(reply.response_text, "Tamam");
                assert!(reply.is_urgent);
            }
            other => panic!("expected valid reply, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_symptom_becomes_none() {
        let parsed = parse_triage_reply(r#"{"responseText":"x","identifiedSymptom":["ateş"],"isUrgent":false}"#);
        assert!(matches!(parsed, ParsedReply::Valid(ref r) if r.identified_symptom.is_none()));
    }

    #[test]
    fn test_missing_urgency_defaults_false() {
        let parsed = parse_triage_reply(r#"{"responseText":"x"}"#);
        assert!(matches!(parsed, ParsedReply::Valid(ref r) if !r.is_urgent));
    }

    #[test]
    fn test_blank_symptom_becomes_none() {
        let parsed = parse_triage_reply(r#"{"responseText":"x","identifiedSymptom":" ","isUrgent":false}"#);
        assert!(matches!(parsed, ParsedReply::Valid(ref r) if r.identified_symptom.is_none()));
    }

    #[test]
    fn test_strip_leaves_unfenced_json() {
        let json = r#"{"responseText":"a","identifiedSymptom":null,"isUrgent":false}"#;
        assert_eq!(strip_code_fences(json), json);
    }

    #[test]
    fn test_strip_nested_fences() {
        assert_eq!(strip_code_fences("```\n```json\n{}\n```\n```"), "{}");
    }

    #[test]
    fn test_serializes_camel_case() {
        let reply = TriageResponse::fallback("x".into());
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("responseText"));
        assert!(json.contains("identifiedSymptom"));
        assert!(json.contains("isUrgent"));
    }

    fn arb_response() -> impl Strategy<Value = TriageResponse> {
        (
            "[a-zA-ZçğıöşüÇĞİÖŞÜ .,!?]{0,40}[a-zA-Z]",
            proptest::option::of("[a-zçğıöşü ]{0,20}[a-z]"),
            any::<bool>(),
        )
            .prop_map(|(response_text, identified_symptom, is_urgent)| TriageResponse {
                response_text,
                identified_symptom,
                is_urgent,
            })
    }

    proptest! {
        #[test]
        fn prop_strip_is_idempotent(text in ".{0,80}") {
            let once = strip_code_fences(&text);
            prop_assert_eq!(strip_code_fences(once), once);
        }

        #[test]
        fn prop_well_formed_reply_passes_through(
            reply in arb_response(),
            wrapper in prop_oneof![
                Just("{}"),
                Just("```json\n{}\n```"),
                Just("```\n{}\n```"),
                Just("```{}```"),
                Just("```json {}\n```"),
            ],
        ) {
            let json = serde_json::to_string_pretty(&reply).unwrap();
            prop_assert_eq!(strip_code_fences(&json), json.as_str());

            let raw = wrapper.replace("{}", &json);
            prop_assert_eq!(parse_triage_reply(&raw), ParsedReply::Valid(reply));
        }
    }
}
