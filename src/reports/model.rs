//! Validation report model
//!
//! The normalized, strongly-shaped output of the analysis step. Field names
//! match the JSON object the analysis provider is asked to produce, so a
//! serialized report can be fed back through the normalizer unchanged.

use serde::{Deserialize, Serialize};

/// Confidence in the analysis, as reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Insufficient,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const ALLOWED: &'static [&'static str] = &["insufficient", "low", "medium", "high"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insufficient" => Some(Self::Insufficient),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Strategic verdict on whether to create the content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Create,
    Pilot,
    Reconsider,
    Indeterminate,
}

impl Verdict {
    pub const ALLOWED: &'static [&'static str] = &["create", "pilot", "reconsider", "indeterminate"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "pilot" => Some(Self::Pilot),
            "reconsider" => Some(Self::Reconsider),
            "indeterminate" => Some(Self::Indeterminate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Pilot => "pilot",
            Self::Reconsider => "reconsider",
            Self::Indeterminate => "indeterminate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategicRecommendation {
    pub verdict: Verdict,
    pub reasoning: Vec<String>,
}

/// Volume and freshness of the conversations behind the analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSignals {
    /// Number of source conversations analyzed
    pub count: u32,
    pub primary_platform: String,
    pub recency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PainPoint {
    pub text: String,
    pub source: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudienceQuestion {
    pub text: String,
    pub source: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentAngle {
    pub format: String,
    pub hook: String,
    pub complexity: String,
    pub description: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceAnalyzed {
    pub platform: String,
    pub count: u32,
    pub relevance: String,
    pub sample_topics: Vec<String>,
    pub citations: Vec<String>,
}

/// Normalized market-demand report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    /// 0-100
    pub demand_score: u8,
    pub demand_interpretation: String,
    pub demand_summary: String,
    pub confidence_level: ConfidenceLevel,
    /// 0-100
    pub confidence_percentage: u8,
    pub strategic_recommendation: StrategicRecommendation,
    pub data_signals: DataSignals,
    pub pain_points: Vec<PainPoint>,
    pub questions: Vec<AudienceQuestion>,
    pub content_angles: Vec<ContentAngle>,
    pub sources_analyzed: Vec<SourceAnalyzed>,
    pub not_recommended_if: Vec<String>,
}

/// Presentation state of a report's content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Sufficient,
    /// No source conversations were found; the report carries no demand signal
    InsufficientData,
}

impl ValidationReport {
    pub fn state(&self) -> ReportState {
        if self.data_signals.count == 0 {
            ReportState::InsufficientData
        } else {
            ReportState::Sufficient
        }
    }
}
