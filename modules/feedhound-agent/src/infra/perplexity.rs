use ai_client::{AiError, OpenAi};
use async_trait::async_trait;
use tracing::info;

use feedhound_common::OracleError;

use crate::traits::ResearchOracle;

pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

const RESEARCH_SYSTEM_PROMPT: &str = "You are an analyst whose mission is to spark debate by \
blending meme culture with biting wit and cleverness.";

/// Research oracle backed by Perplexity's OpenAI-compatible chat API.
pub struct PerplexityResearcher {
    ai: OpenAi,
}

impl PerplexityResearcher {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            ai: OpenAi::new(api_key, model).with_base_url(PERPLEXITY_API_URL),
        }
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.ai = self.ai.with_base_url(url);
        self
    }
}

#[async_trait]
impl ResearchOracle for PerplexityResearcher {
    async fn research(&self, query: &str) -> Result<Option<String>, OracleError> {
        info!(query, model = self.ai.model(), "Researching topic");
        match self.ai.chat_completion(RESEARCH_SYSTEM_PROMPT, research_prompt(query)).await {
            Ok(summary) if summary.trim().is_empty() => Ok(None),
            Ok(summary) => Ok(Some(summary)),
            Err(AiError::EmptyResponse(_)) => Ok(None),
            Err(e) => Err(OracleError::Unavailable(e.to_string())),
        }
    }
}

fn research_prompt(query: &str) -> String {
    format!(
        "Provide concise, detailed research on this topic and any notable individuals mentioned, \
designed to inform an analyst and commentator on X. Consider the latest developments first: {query}\n\n\
Break the analysis into these sections, keeping each brief and clear:\n\
- Overview of the topic\n\
- Latest developments in the news\n\
- Financial and economic implications\n\
- Popular consensus\n\
- Key arguments for and against the consensus, and their logic\n\
- Notable individuals and their relevance to the post (answer 'none' if there are none)\n\
- Conclusion"
    )
}
