use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard ceiling the platform enforces on a single post, in characters.
pub const MAX_POST_CHARS: usize = 280;

/// Length the persona is asked to stay under, leaving headroom below the ceiling.
pub const TARGET_POST_CHARS: usize = 220;

/// Research summary used whenever research is unavailable.
pub const NO_RESEARCH_PLACEHOLDER: &str = "No additional insights available.";

/// Media description used when an image could not be described.
pub const NO_MEDIA_DESCRIPTION: &str = "No description available.";

/// Length of `text` in Unicode scalar values.
///
/// X weights URLs as 23 and most CJK and emoji as 2, so a text at the limit
/// here can still be refused by the platform. That refusal is not retried.
pub fn post_length(text: &str) -> usize {
    text.chars().count()
}

// --- Feed ---

/// A feed post under consideration for a response.
///
/// When the fetched post referenced another post, `id` and the content
/// fields describe the referenced (resolved) post and `original_id` keeps
/// the id that appeared in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub original_id: Option<String>,
    pub author_handle: String,
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub media_descriptions: Vec<String>,
    #[serde(default)]
    pub engagement: BTreeMap<String, u64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, author_handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            original_id: None,
            author_handle: author_handle.into(),
            text: text.into(),
            media_urls: Vec::new(),
            media_descriptions: Vec::new(),
            engagement: BTreeMap::new(),
            created_at: None,
        }
    }
}

/// The chosen candidate plus whatever research could be gathered for it.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    pub candidate: Candidate,
    pub research_summary: String,
}

impl Context {
    pub fn new(candidate: Candidate, research_summary: Option<String>) -> Self {
        Self {
            candidate,
            research_summary: research_summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NO_RESEARCH_PLACEHOLDER.to_string()),
        }
    }

    pub fn has_research(&self) -> bool {
        self.research_summary != NO_RESEARCH_PLACEHOLDER
    }
}

// --- Response ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Reply,
    Quote,
}

impl ResponseMode {
    pub fn is_quote(self) -> bool {
        self == ResponseMode::Quote
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseMode::Reply => write!(f, "reply"),
            ResponseMode::Quote => write!(f, "quote"),
        }
    }
}

/// Validated response text ready for publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    /// The model's reasoning; logged, never posted.
    pub analysis: String,
    pub text: String,
    /// Follow-up posts, chained as replies after `text`. Empty for replies.
    pub thread: Vec<String>,
}

/// One successfully created post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostResult {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_handle: String,
}
