//! Print/PDF export schema
//!
//! `ExportDocument` is the layout-oriented shape handed to the PDF renderer.
//! The mapping destructures every `ValidationReport` field without a rest
//! pattern: a new report field does not compile until it is mapped here.

use serde::Serialize;

use super::model::{
    AudienceQuestion, ContentAngle, DataSignals, PainPoint, SourceAnalyzed,
    StrategicRecommendation, ValidationReport,
};
use super::{ReportState, StoredReport};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBlock {
    pub value: u8,
    pub label: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBlock {
    pub level: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerdictBlock {
    pub headline: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalBlock {
    pub conversations: u32,
    pub primary_platform: String,
    pub recency: String,
    pub insufficient_data: bool,
}

/// One line in a titled section
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    pub heading: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSection {
    pub title: String,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub title: String,
    pub subtitle: String,
    pub generated_at: String,
    pub score: ScoreBlock,
    pub confidence: ConfidenceBlock,
    pub verdict: VerdictBlock,
    pub signals: SignalBlock,
    pub sections: Vec<ExportSection>,
}

fn verdict_headline(rec: &StrategicRecommendation) -> String {
    use super::model::Verdict;
    match rec.verdict {
        Verdict::Create => "Create this content",
        Verdict::Pilot => "Pilot a smaller version first",
        Verdict::Reconsider => "Reconsider this topic",
        Verdict::Indeterminate => "Not enough evidence to decide",
    }
    .to_string()
}

fn pain_point_item(p: &PainPoint) -> ExportItem {
    ExportItem {
        heading: p.text.clone(),
        detail: format!("{} ({})", p.source, p.frequency),
        links: Vec::new(),
    }
}

fn question_item(q: &AudienceQuestion) -> ExportItem {
    let status = if q.resolved { "answered" } else { "open" };
    ExportItem {
        heading: q.text.clone(),
        detail: format!("{} - {status}", q.source),
        links: Vec::new(),
    }
}

fn angle_item(a: &ContentAngle) -> ExportItem {
    ExportItem {
        heading: format!("{}: {}", a.format, a.hook),
        detail: format!("{} [{} on {}]", a.description, a.complexity, a.platform),
        links: Vec::new(),
    }
}

fn source_item(s: &SourceAnalyzed) -> ExportItem {
    let mut detail = format!("{} conversations, relevance {}", s.count, s.relevance);
    if !s.sample_topics.is_empty() {
        detail.push_str(&format!(". Topics: {}", s.sample_topics.join(", ")));
    }
    ExportItem {
        heading: s.platform.clone(),
        detail,
        links: s.citations.clone(),
    }
}

fn section(title: &str, items: Vec<ExportItem>) -> Option<ExportSection> {
    if items.is_empty() {
        None
    } else {
        Some(ExportSection {
            title: title.to_string(),
            items,
        })
    }
}

impl From<&StoredReport> for ExportDocument {
    fn from(stored: &StoredReport) -> Self {
        let insufficient_data = stored.state() == ReportState::InsufficientData;
        let ValidationReport {
            demand_score,
            demand_interpretation,
            demand_summary,
            confidence_level,
            confidence_percentage,
            strategic_recommendation,
            data_signals,
            pain_points,
            questions,
            content_angles,
            sources_analyzed,
            not_recommended_if,
        } = &stored.report;
        let DataSignals {
            count,
            primary_platform,
            recency,
        } = data_signals;

        let sections = [
            section("Pain points", pain_points.iter().map(pain_point_item).collect()),
            section("Audience questions", questions.iter().map(question_item).collect()),
            section("Content angles", content_angles.iter().map(angle_item).collect()),
            section("Sources analyzed", sources_analyzed.iter().map(source_item).collect()),
            section(
                "Not recommended if",
                not_recommended_if
                    .iter()
                    .map(|reason| ExportItem {
                        heading: reason.clone(),
                        detail: String::new(),
                        links: Vec::new(),
                    })
                    .collect(),
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            title: stored.topic.clone(),
            subtitle: format!("Audience: {}", stored.audience),
            generated_at: stored.created_at.to_rfc3339(),
            score: ScoreBlock {
                value: *demand_score,
                label: demand_interpretation.clone(),
                summary: demand_summary.clone(),
            },
            confidence: ConfidenceBlock {
                level: confidence_level.as_str().to_string(),
                percentage: *confidence_percentage,
            },
            verdict: VerdictBlock {
                headline: verdict_headline(strategic_recommendation),
                reasons: strategic_recommendation.reasoning.clone(),
            },
            signals: SignalBlock {
                conversations: *count,
                primary_platform: primary_platform.clone(),
                recency: recency.clone(),
                insufficient_data,
            },
            sections,
        }
    }
}
