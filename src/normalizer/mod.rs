//! Response normalizer
//!
//! Turns raw text from a chat-completion API into a `ValidationReport`.
//! The text is expected, but not guaranteed, to hold a single JSON object.
//!
//! ## Pipeline
//!
//! 1. strip code fences
//! 2. strip numeric citation markers
//! 3. slice from the first `{` to the last `}`
//! 4. replace control characters with spaces
//! 5. strict parse
//! 6. on failure, one bounded repair pass and a second parse
//! 7. shape validation
//!
//! Failures keep the original raw text for operator logs. It is never part
//! of the `Display` output, and `user_message()` is what end users see.

pub mod schema;
pub mod steps;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::reports::model::ValidationReport;

/// Message shown to end users for any parse-path failure
pub const RETRY_MESSAGE: &str =
    "We couldn't analyze this topic right now. Please try again in a moment.";

/// Parse-path failures
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// No JSON object could be located
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    /// JSON-like text that failed to parse even after repair
    #[error("unparsable response: {reason}")]
    UnparsableResponse { reason: String, raw: String },

    /// Parsed, but does not have the report shape
    #[error("schema violation at `{field}`: {reason}")]
    SchemaViolation {
        field: String,
        reason: String,
        raw: String,
    },
}

impl NormalizeError {
    /// Short machine-readable kind for logs and analytics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedResponse { .. } => "malformed_response",
            Self::UnparsableResponse { .. } => "unparsable_response",
            Self::SchemaViolation { .. } => "schema_violation",
        }
    }

    /// Original provider text, for operator diagnostics only
    pub fn raw(&self) -> &str {
        match self {
            Self::MalformedResponse { raw, .. }
            | Self::UnparsableResponse { raw, .. }
            | Self::SchemaViolation { raw, .. } => raw,
        }
    }

    /// Offending field for schema violations
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::SchemaViolation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        RETRY_MESSAGE
    }
}

/// Normalize raw provider output into a report.
pub fn normalize(raw: &str) -> Result<ValidationReport, NormalizeError> {
    let malformed = |reason: &str| NormalizeError::MalformedResponse {
        reason: reason.to_string(),
        raw: raw.to_string(),
    };

    if raw.trim().is_empty() {
        return Err(malformed("empty response"));
    }

    let text = steps::strip_code_fences(raw);
    let text = steps::strip_citations(&text);
    let slice = steps::slice_object(&text).ok_or_else(|| malformed("no JSON object found"))?;
    let cleaned = steps::strip_control_chars(slice);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(strict_err) => {
            debug!(error = %strict_err, "Strict parse failed, attempting repair");
            let repaired = steps::repair(&cleaned);
            serde_json::from_str(&repaired).map_err(|repair_err| {
                NormalizeError::UnparsableResponse {
                    reason: format!("{strict_err}; after repair: {repair_err}"),
                    raw: raw.to_string(),
                }
            })?
        }
    };

    schema::validate(&value).map_err(|v| NormalizeError::SchemaViolation {
        field: v.field,
        reason: v.reason,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "demand_score": 81,
        "demand_interpretation": "High demand",
        "demand_summary": "Creators keep asking for a practical guide.",
        "confidence_level": "high",
        "confidence_percentage": 77,
        "strategic_recommendation": {"verdict": "create", "reasoning": ["Unmet need"]},
        "data_signals": {"count": 120, "primary_platform": "Reddit", "recency": "past 30 days"}
    }"#;

    #[test]
    fn test_fenced_with_prose_and_citations() {
        let raw = format!("Sure! Here is the analysis[1]:\n```json\n{BODY}\n```\nLet me know[2].");
        let report = normalize(&raw).unwrap();
        assert_eq!(report.demand_score, 81);
        assert_eq!(report.data_signals.count, 120);
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = normalize("   \n").unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn test_no_brace_is_malformed() {
        let err = normalize("I could not find anything about that topic.").unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedResponse { .. }));
    }

    #[test]
    fn test_garbage_object_is_unparsable() {
        let raw = "{ demand_score: eighty }";
        let err = normalize(raw).unwrap_err();
        assert!(matches!(err, NormalizeError::UnparsableResponse { .. }));
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn test_raw_text_not_in_display() {
        let raw = "{ secret-provider-text }";
        let err = normalize(raw).unwrap_err();
        assert!(!err.to_string().contains("secret-provider-text"));
        assert_eq!(err.user_message(), RETRY_MESSAGE);
    }

    #[test]
    fn test_raw_control_characters_inside_strings() {
        let raw = BODY.replace("practical guide.", "practical\tguide.\n");
        let report = normalize(&raw).unwrap();
        assert_eq!(report.demand_summary, "Creators keep asking for a practical guide. ");
    }

    #[test]
    fn test_schema_violation_names_field() {
        let raw = BODY.replace("\"demand_score\": 81,", "");
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
        assert_eq!(err.field(), Some("demand_score"));
    }
}
