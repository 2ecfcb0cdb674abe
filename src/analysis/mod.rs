//! Analysis provider boundary
//!
//! The provider turns a topic/audience pair into raw text that should hold a
//! report JSON object. Parsing that text is the normalizer's job.

pub mod perplexity;
pub mod prompt;

pub use perplexity::{PerplexityClient, PerplexityConfig};

use thiserror::Error;

/// Provider call failures. No retries happen inside the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Produces raw analysis text for a topic and audience
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, topic: &str, audience: &str) -> Result<String, ProviderError>;
}
