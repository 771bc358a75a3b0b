// Test mocks for the decision-and-publish pipeline.
//
// One mock per trait boundary:
// - MockFeed (FeedSource): queued batches, runs the injected describer
// - MockDescriber (MediaDescriber): deterministic URL→description
// - MockOracle (GenerativeOracle): scripted answers per operation, call counts
// - MockResearch (ResearchOracle): fixed answer, records queries
// - MockPostClient (PostClient): queued outcomes, records every attempt
//
// All mocks are builder-style: configure, wrap in Arc, hand to the pipeline.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use feedhound_common::{
    Candidate, Context, OracleError, PostResult, PublishError, NO_MEDIA_DESCRIPTION,
};

use crate::traits::{
    FeedSource, GenerativeOracle, MediaDescriber, PostClient, QuoteDraft, ReplyDraft,
    ResearchOracle,
};

/// Handle the mock post client reports as the author.
pub const MOCK_HANDLE: &str = "feedhound";

fn unavailable(what: &str) -> OracleError {
    OracleError::Unavailable(format!("mock {what} failure"))
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

enum FeedBehavior {
    Batches,
    Fail,
    Panic,
}

/// Queued candidate batches, one per fetch. The last batch is sticky so a
/// feed that "doesn't change" keeps returning it. No batches → empty feed.
pub struct MockFeed {
    batches: Mutex<VecDeque<Vec<Candidate>>>,
    behavior: FeedBehavior,
    fetches: Mutex<usize>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            behavior: FeedBehavior::Batches,
            fetches: Mutex::new(0),
        }
    }

    pub fn with_batch(self, batch: Vec<Candidate>) -> Self {
        self.batches.lock().unwrap().push_back(batch);
        self
    }

    pub fn failing() -> Self {
        Self {
            behavior: FeedBehavior::Fail,
            ..Self::new()
        }
    }

    pub fn panicking() -> Self {
        Self {
            behavior: FeedBehavior::Panic,
            ..Self::new()
        }
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    fn next_batch(&self) -> Vec<Candidate> {
        let mut batches = self.batches.lock().unwrap();
        if batches.len() > 1 {
            batches.pop_front().unwrap_or_default()
        } else {
            batches.front().cloned().unwrap_or_default()
        }
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch_candidates(
        &self,
        _list_id: &str,
        max_results: u32,
        describer: &dyn MediaDescriber,
    ) -> Result<Vec<Candidate>> {
        *self.fetches.lock().unwrap() += 1;
        match self.behavior {
            FeedBehavior::Fail => bail!("MockFeed: scripted fetch failure"),
            FeedBehavior::Panic => panic!("MockFeed: scripted panic"),
            FeedBehavior::Batches => {}
        }

        let mut batch = self.next_batch();
        batch.truncate(max_results as usize);
        for candidate in &mut batch {
            if candidate.media_descriptions.is_empty() {
                for url in &candidate.media_urls {
                    let description = describer
                        .describe_media(url)
                        .await
                        .unwrap_or_else(|_| NO_MEDIA_DESCRIPTION.to_string());
                    candidate.media_descriptions.push(description);
                }
            }
        }
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// MockDescriber
// ---------------------------------------------------------------------------

/// Describes every URL as `"photo at {url}"`, or fails every call.
pub struct MockDescriber {
    fail: bool,
    urls: Mutex<Vec<String>>,
}

impl MockDescriber {
    pub fn new() -> Self {
        Self {
            fail: false,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn described(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Default for MockDescriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDescriber for MockDescriber {
    async fn describe_media(&self, url: &str) -> std::result::Result<String, OracleError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(unavailable("describe_media"));
        }
        Ok(format!("photo at {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockOracle
// ---------------------------------------------------------------------------

enum Selection {
    First,
    Fixed(Option<String>),
    Fail,
}

/// Scripted generative oracle.
///
/// Defaults: selects the first candidate, proposes no research topic,
/// decides "reply", and composes short valid drafts. Compose scripts are
/// queues; once drained the default draft is returned.
pub struct MockOracle {
    selection: Selection,
    topic: std::result::Result<Option<String>, ()>,
    decision: std::result::Result<String, ()>,
    replies: Mutex<VecDeque<Option<ReplyDraft>>>,
    quotes: Mutex<VecDeque<Option<QuoteDraft>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            selection: Selection::First,
            topic: Ok(None),
            decision: Ok("reply".to_string()),
            replies: Mutex::new(VecDeque::new()),
            quotes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn selecting(mut self, id: Option<&str>) -> Self {
        self.selection = Selection::Fixed(id.map(str::to_string));
        self
    }

    pub fn failing_selection(mut self) -> Self {
        self.selection = Selection::Fail;
        self
    }

    pub fn with_topic(mut self, query: Option<&str>) -> Self {
        self.topic = Ok(query.map(str::to_string));
        self
    }

    pub fn failing_topic(mut self) -> Self {
        self.topic = Err(());
        self
    }

    pub fn deciding(mut self, raw: &str) -> Self {
        self.decision = Ok(raw.to_string());
        self
    }

    pub fn failing_decision(mut self) -> Self {
        self.decision = Err(());
        self
    }

    /// Queue a reply draft.
    pub fn reply(self, analysis: &str, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Some(ReplyDraft {
            analysis: analysis.to_string(),
            text: text.to_string(),
        }));
        self
    }

    /// Queue a failed reply composition.
    pub fn reply_failure(self) -> Self {
        self.replies.lock().unwrap().push_back(None);
        self
    }

    /// Queue a quote draft.
    pub fn quote(self, analysis: &str, text: &str, thread: &[&str]) -> Self {
        self.quotes.lock().unwrap().push_back(Some(QuoteDraft {
            analysis: analysis.to_string(),
            text: text.to_string(),
            thread: thread.iter().map(|s| s.to_string()).collect(),
        }));
        self
    }

    pub fn quote_failure(self) -> Self {
        self.quotes.lock().unwrap().push_back(None);
        self
    }

    /// How many times `operation` (the trait method name) was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeOracle for MockOracle {
    async fn select_best(
        &self,
        candidates: &[Candidate],
    ) -> std::result::Result<Option<String>, OracleError> {
        self.record("select_best");
        match &self.selection {
            Selection::First => Ok(candidates.first().map(|c| c.id.clone())),
            Selection::Fixed(id) => Ok(id.clone()),
            Selection::Fail => Err(unavailable("select_best")),
        }
    }

    async fn identify_research_topic(
        &self,
        _candidate: &Candidate,
    ) -> std::result::Result<Option<String>, OracleError> {
        self.record("identify_research_topic");
        self.topic
            .clone()
            .map_err(|_| unavailable("identify_research_topic"))
    }

    async fn decide_mode(&self, _context: &Context) -> std::result::Result<String, OracleError> {
        self.record("decide_mode");
        self.decision.clone().map_err(|_| unavailable("decide_mode"))
    }

    async fn compose_reply(&self, _context: &Context) -> std::result::Result<ReplyDraft, OracleError> {
        self.record("compose_reply");
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(draft)) => Ok(draft),
            Some(None) => Err(unavailable("compose_reply")),
            None => Ok(ReplyDraft {
                analysis: "mock analysis".to_string(),
                text: "Mock reply".to_string(),
            }),
        }
    }

    async fn compose_quote(&self, _context: &Context) -> std::result::Result<QuoteDraft, OracleError> {
        self.record("compose_quote");
        match self.quotes.lock().unwrap().pop_front() {
            Some(Some(draft)) => Ok(draft),
            Some(None) => Err(unavailable("compose_quote")),
            None => Ok(QuoteDraft {
                analysis: "mock analysis".to_string(),
                text: "Mock quote".to_string(),
                thread: Vec::new(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockResearch
// ---------------------------------------------------------------------------

pub struct MockResearch {
    answer: std::result::Result<Option<String>, ()>,
    queries: Mutex<Vec<String>>,
}

impl MockResearch {
    pub fn answering(summary: &str) -> Self {
        Self {
            answer: Ok(Some(summary.to_string())),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            answer: Ok(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResearchOracle for MockResearch {
    async fn research(&self, query: &str) -> std::result::Result<Option<String>, OracleError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answer.clone().map_err(|_| unavailable("research"))
    }
}

// ---------------------------------------------------------------------------
// MockPostClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Quote,
    Reply,
}

/// One attempted write, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPost {
    pub kind: PostKind,
    pub target_id: String,
    pub text: String,
}

#[derive(Clone, Copy)]
enum Outcome {
    Ok,
    Transient,
    Rejected,
}

/// Platform client whose per-call outcomes are queued up front.
/// Calls beyond the queue succeed. Successful posts get ids `post-1`, `post-2`, …
pub struct MockPostClient {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<RecordedPost>>,
    posted: Mutex<Vec<PostResult>>,
}

impl MockPostClient {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn then_ok(self) -> Self {
        self.push(Outcome::Ok)
    }

    pub fn then_transient(self) -> Self {
        self.push(Outcome::Transient)
    }

    pub fn then_rejected(self) -> Self {
        self.push(Outcome::Rejected)
    }

    /// Every call ends in a transient failure.
    pub fn always_transient(self, calls: usize) -> Self {
        (0..calls).fold(self, |client, _| client.then_transient())
    }

    pub fn calls(&self) -> Vec<RecordedPost> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn posted(&self) -> Vec<PostResult> {
        self.posted.lock().unwrap().clone()
    }

    fn push(self, outcome: Outcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    fn handle(
        &self,
        kind: PostKind,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<PostResult, PublishError> {
        self.calls.lock().unwrap().push(RecordedPost {
            kind,
            target_id: target_id.to_string(),
            text: text.to_string(),
        });

        let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Outcome::Ok);
        match outcome {
            Outcome::Transient => Err(PublishError::Transient("mock 503".to_string())),
            Outcome::Rejected => Err(PublishError::Rejected("mock 403".to_string())),
            Outcome::Ok => {
                let mut posted = self.posted.lock().unwrap();
                let post = PostResult {
                    id: format!("post-{}", posted.len() + 1),
                    text: text.to_string(),
                    created_at: Utc::now(),
                    author_handle: MOCK_HANDLE.to_string(),
                };
                posted.push(post.clone());
                Ok(post)
            }
        }
    }
}

impl Default for MockPostClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostClient for MockPostClient {
    async fn create_quote_post(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<PostResult, PublishError> {
        self.handle(PostKind::Quote, target_id, text)
    }

    async fn create_reply_post(
        &self,
        target_id: &str,
        text: &str,
    ) -> std::result::Result<PostResult, PublishError> {
        self.handle(PostKind::Reply, target_id, text)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A candidate with a photo attached.
pub fn candidate_with_photo(id: &str, handle: &str, text: &str, url: &str) -> Candidate {
    let mut candidate = Candidate::new(id, handle, text);
    candidate.media_urls.push(url.to_string());
    candidate
}
