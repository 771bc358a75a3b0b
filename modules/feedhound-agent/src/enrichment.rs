use std::sync::Arc;

use ai_client::truncate_to_char_boundary;
use tracing::{debug, info, warn};

use feedhound_common::{Candidate, Context};

use crate::traits::{GenerativeOracle, ResearchOracle};

/// Attaches background research to the chosen candidate.
///
/// Two soft-failing steps: the generative oracle proposes a research query,
/// then the research oracle answers it. Either failing leaves the context
/// with the placeholder summary; enrichment itself never fails.
pub struct ContextEnricher {
    oracle: Arc<dyn GenerativeOracle>,
    research: Arc<dyn ResearchOracle>,
}

impl ContextEnricher {
    pub fn new(oracle: Arc<dyn GenerativeOracle>, research: Arc<dyn ResearchOracle>) -> Self {
        Self { oracle, research }
    }

    pub async fn enrich(&self, candidate: Candidate) -> Context {
        let summary = match self.research_query(&candidate).await {
            Some(query) => self.research_summary(&query).await,
            None => None,
        };
        Context::new(candidate, summary)
    }

    async fn research_query(&self, candidate: &Candidate) -> Option<String> {
        match self.oracle.identify_research_topic(candidate).await {
            Ok(Some(query)) if !query.trim().is_empty() => {
                let query = query.trim().to_string();
                info!(candidate_id = %candidate.id, query = %query, "Research topic identified");
                Some(query)
            }
            Ok(_) => {
                info!(candidate_id = %candidate.id, "No research topic for candidate");
                None
            }
            Err(e) => {
                warn!(candidate_id = %candidate.id, error = %e, "Research topic identification failed");
                None
            }
        }
    }

    async fn research_summary(&self, query: &str) -> Option<String> {
        match self.research.research(query).await {
            Ok(Some(summary)) => {
                debug!(
                    preview = truncate_to_char_boundary(&summary, 200),
                    chars = summary.chars().count(),
                    "Research summary received"
                );
                Some(summary)
            }
            Ok(None) => {
                info!(query, "Research returned nothing");
                None
            }
            Err(e) => {
                warn!(query, error = %e, "Research failed");
                None
            }
        }
    }
}
