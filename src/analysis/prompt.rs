//! Prompt template for the market-demand analysis

/// System prompt describing the JSON object the provider must return
pub const SYSTEM_PROMPT: &str = r#"You are a market research analyst for content creators.
Search recent public conversations (forums, Q&A sites, social platforms, video comments)
and assess demand for the requested content. Respond with a single JSON object and nothing else:
{
  "demand_score": integer 0-100,
  "demand_interpretation": short label,
  "demand_summary": two or three sentences,
  "confidence_level": "insufficient" | "low" | "medium" | "high",
  "confidence_percentage": integer 0-100,
  "strategic_recommendation": {"verdict": "create" | "pilot" | "reconsider" | "indeterminate", "reasoning": [string]},
  "data_signals": {"count": integer, "primary_platform": string, "recency": string},
  "pain_points": [{"text": string, "source": string, "frequency": string}],
  "questions": [{"text": string, "source": string, "resolved": boolean}],
  "content_angles": [{"format": string, "hook": string, "complexity": string, "description": string, "platform": string}],
  "sources_analyzed": [{"platform": string, "count": integer, "relevance": string, "sample_topics": [string], "citations": [url]}],
  "not_recommended_if": [string]
}
If you find no relevant conversations, set data_signals.count to 0 and confidence_level to "insufficient".
Never invent sources."#;

/// User prompt for one topic/audience pair
pub fn user_prompt(topic: &str, audience: &str) -> String {
    format!(
        "Content topic: {}\nTarget audience: {}\nAnalyze demand for this content among this audience.",
        topic.trim(),
        audience.trim()
    )
}
