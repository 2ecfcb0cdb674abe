//! Shape validation of parsed provider output
//!
//! Walks a `serde_json::Value` and builds a `ValidationReport`, stopping at
//! the first missing or invalid field. Scores are clamped to 0-100 and string
//! values are cleaned the same way the raw text was; nothing else is coerced.

use serde_json::{Map, Value};

use super::steps::clean_string;

use crate::reports::model::{
    AudienceQuestion, ConfidenceLevel, ContentAngle, DataSignals, PainPoint, SourceAnalyzed,
    StrategicRecommendation, ValidationReport, Verdict,
};

/// First field that failed validation, as a dotted path (`data_signals.count`,
/// `pain_points[2].text`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

type Checked<T> = Result<T, Violation>;

fn violation(field: &str, reason: impl Into<String>) -> Violation {
    Violation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Checked<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| violation(path, format!("expected object, found {}", type_name(value))))
}

fn required<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Checked<&'a Value> {
    obj.get(key)
        .ok_or_else(|| violation(&join(path, key), "missing required field"))
}

fn string(obj: &Map<String, Value>, path: &str, key: &str) -> Checked<String> {
    let value = required(obj, path, key)?;
    value.as_str().map(clean_string).ok_or_else(|| {
        violation(
            &join(path, key),
            format!("expected string, found {}", type_name(value)),
        )
    })
}

fn boolean(obj: &Map<String, Value>, path: &str, key: &str) -> Checked<bool> {
    let value = required(obj, path, key)?;
    value.as_bool().ok_or_else(|| {
        violation(
            &join(path, key),
            format!("expected boolean, found {}", type_name(value)),
        )
    })
}

/// A 0-100 score. Out-of-range and fractional values are clamped and rounded.
fn score(obj: &Map<String, Value>, path: &str, key: &str) -> Checked<u8> {
    let value = required(obj, path, key)?;
    let number = value.as_f64().ok_or_else(|| {
        violation(
            &join(path, key),
            format!("expected number, found {}", type_name(value)),
        )
    })?;
    Ok(number.round().clamp(0.0, 100.0) as u8)
}

fn count(obj: &Map<String, Value>, path: &str, key: &str) -> Checked<u32> {
    let value = required(obj, path, key)?;
    let field = join(path, key);
    match value {
        Value::Number(n) => {
            let c = n
                .as_u64()
                .ok_or_else(|| violation(&field, "expected a non-negative integer"))?;
            u32::try_from(c).map_err(|_| violation(&field, "count out of range"))
        }
        other => Err(violation(
            &field,
            format!("expected number, found {}", type_name(other)),
        )),
    }
}

fn enum_value<T>(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
    parse: impl Fn(&str) -> Option<T>,
) -> Checked<T> {
    let raw = string(obj, path, key)?;
    parse(&raw).ok_or_else(|| {
        violation(
            &join(path, key),
            format!("`{raw}` is not one of {}", allowed.join("|")),
        )
    })
}

/// An optional list: absent or null yields an empty list, anything other
/// than an array is a violation.
fn list<T>(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    item: impl Fn(&Value, &str) -> Checked<T>,
) -> Checked<Vec<T>> {
    let field = join(path, key);
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| item(v, &format!("{field}[{i}]")))
            .collect(),
        Some(other) => Err(violation(
            &field,
            format!("expected array, found {}", type_name(other)),
        )),
    }
}

fn string_item(value: &Value, path: &str) -> Checked<String> {
    value.as_str().map(clean_string).ok_or_else(|| {
        violation(path, format!("expected string, found {}", type_name(value)))
    })
}

fn pain_point(value: &Value, path: &str) -> Checked<PainPoint> {
    let obj = as_object(value, path)?;
    Ok(PainPoint {
        text: string(obj, path, "text")?,
        source: string(obj, path, "source")?,
        frequency: string(obj, path, "frequency")?,
    })
}

fn question(value: &Value, path: &str) -> Checked<AudienceQuestion> {
    let obj = as_object(value, path)?;
    Ok(AudienceQuestion {
        text: string(obj, path, "text")?,
        source: string(obj, path, "source")?,
        resolved: boolean(obj, path, "resolved")?,
    })
}

fn content_angle(value: &Value, path: &str) -> Checked<ContentAngle> {
    let obj = as_object(value, path)?;
    Ok(ContentAngle {
        format: string(obj, path, "format")?,
        hook: string(obj, path, "hook")?,
        complexity: string(obj, path, "complexity")?,
        description: string(obj, path, "description")?,
        platform: string(obj, path, "platform")?,
    })
}

fn source_analyzed(value: &Value, path: &str) -> Checked<SourceAnalyzed> {
    let obj = as_object(value, path)?;
    Ok(SourceAnalyzed {
        platform: string(obj, path, "platform")?,
        count: count(obj, path, "count")?,
        relevance: string(obj, path, "relevance")?,
        sample_topics: list(obj, path, "sample_topics", string_item)?,
        citations: list(obj, path, "citations", string_item)?,
    })
}

/// Validate a parsed object against the report shape.
pub fn validate(value: &Value) -> Checked<ValidationReport> {
    let root = as_object(value, "$")?;

    let demand_score = score(root, "", "demand_score")?;
    let demand_interpretation = string(root, "", "demand_interpretation")?;
    let demand_summary = string(root, "", "demand_summary")?;
    let confidence_level = enum_value(
        root,
        "",
        "confidence_level",
        ConfidenceLevel::ALLOWED,
        ConfidenceLevel::parse,
    )?;
    let confidence_percentage = score(root, "", "confidence_percentage")?;

    let rec = as_object(
        required(root, "", "strategic_recommendation")?,
        "strategic_recommendation",
    )?;
    let strategic_recommendation = StrategicRecommendation {
        verdict: enum_value(
            rec,
            "strategic_recommendation",
            "verdict",
            Verdict::ALLOWED,
            Verdict::parse,
        )?,
        reasoning: list(rec, "strategic_recommendation", "reasoning", string_item)?,
    };

    let signals = as_object(required(root, "", "data_signals")?, "data_signals")?;
    let data_signals = DataSignals {
        count: count(signals, "data_signals", "count")?,
        primary_platform: string(signals, "data_signals", "primary_platform")?,
        recency: string(signals, "data_signals", "recency")?,
    };

    // "insufficient" is reserved for, and required by, an empty data set
    let no_data = data_signals.count == 0;
    if no_data != (confidence_level == ConfidenceLevel::Insufficient) {
        return Err(violation(
            "confidence_level",
            format!(
                "`{}` is inconsistent with data_signals.count = {}",
                confidence_level.as_str(),
                data_signals.count
            ),
        ));
    }

    Ok(ValidationReport {
        demand_score,
        demand_interpretation,
        demand_summary,
        confidence_level,
        confidence_percentage,
        strategic_recommendation,
        data_signals,
        pain_points: list(root, "", "pain_points", pain_point)?,
        questions: list(root, "", "questions", question)?,
        content_angles: list(root, "", "content_angles", content_angle)?,
        sources_analyzed: list(root, "", "sources_analyzed", source_analyzed)?,
        not_recommended_if: list(root, "", "not_recommended_if", string_item)?,
    })
}
