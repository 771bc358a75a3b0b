// Trait seams between the decision-and-publish pipeline and the outside world.
//
// FeedSource / MediaDescriber: where candidates come from.
// GenerativeOracle / ResearchOracle: every model call the pipeline makes.
// PostClient: the platform writes.
//
// Production implementations live in `infra`; `testing` has scriptable mocks
// so the whole cycle runs without network.

use anyhow::Result;
use async_trait::async_trait;

use feedhound_common::{Candidate, Context, OracleError, PostResult, PublishError};

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Turns a media URL into prose the text-only steps can reason about.
#[async_trait]
pub trait MediaDescriber: Send + Sync {
    async fn describe_media(&self, url: &str) -> std::result::Result<String, OracleError>;
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch up to `max_results` candidates from a list, resolving quoted or
    /// referenced posts and describing attached photos with `describer`.
    ///
    /// Transport failures are expected to come back as an empty batch.
    async fn fetch_candidates(
        &self,
        list_id: &str,
        max_results: u32,
        describer: &dyn MediaDescriber,
    ) -> Result<Vec<Candidate>>;
}

// ---------------------------------------------------------------------------
// Oracles
// ---------------------------------------------------------------------------

/// A reply as composed by the model, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyDraft {
    pub analysis: String,
    pub text: String,
}

/// A quote post plus optional thread, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDraft {
    pub analysis: String,
    pub text: String,
    pub thread: Vec<String>,
}

#[async_trait]
pub trait GenerativeOracle: Send + Sync {
    /// Id of the most noteworthy candidate, or `None` if the model declines.
    async fn select_best(
        &self,
        candidates: &[Candidate],
    ) -> std::result::Result<Option<String>, OracleError>;

    /// A specific research query for the candidate, or `None`.
    async fn identify_research_topic(
        &self,
        candidate: &Candidate,
    ) -> std::result::Result<Option<String>, OracleError>;

    /// The model's raw "reply" / "quote" answer.
    async fn decide_mode(&self, context: &Context) -> std::result::Result<String, OracleError>;

    async fn compose_reply(&self, context: &Context)
        -> std::result::Result<ReplyDraft, OracleError>;

    async fn compose_quote(&self, context: &Context)
        -> std::result::Result<QuoteDraft, OracleError>;
}

#[async_trait]
pub trait ResearchOracle: Send + Sync {
    /// Structured background summary for `query`, or `None` if nothing came back.
    async fn research(&self, query: &str) -> std::result::Result<Option<String>, OracleError>;
}

// ---------------------------------------------------------------------------
// Platform writes
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostClient: Send + Sync {
    async fn create_quote_post(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<PostResult, PublishError>;

    async fn create_reply_post(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<PostResult, PublishError>;
}
