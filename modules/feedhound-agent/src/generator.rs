use std::sync::Arc;

use ai_client::strip_wrapping_quotes;
use thiserror::Error;
use tracing::{debug, info, warn};

use feedhound_common::{post_length, Context, GeneratedContent, ResponseMode, MAX_POST_CHARS};

use crate::traits::{GenerativeOracle, QuoteDraft, ReplyDraft};

/// Why a draft was thrown away.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DraftRejection {
    #[error("post text is empty")]
    EmptyText,

    #[error("post text is {0} characters, limit is {MAX_POST_CHARS}")]
    TextTooLong(usize),

    #[error("thread segment {index} is {len} characters, limit is {MAX_POST_CHARS}")]
    SegmentTooLong { index: usize, len: usize },
}

/// Produces post text from a context, retrying drafts that fail validation.
///
/// Each attempt is one compose call. An oracle error or a rejected draft
/// burns the attempt; when the budget runs out the result is `None`
/// ("nothing to post").
pub struct ContentGenerator {
    oracle: Arc<dyn GenerativeOracle>,
    max_attempts: u32,
}

impl ContentGenerator {
    pub fn new(oracle: Arc<dyn GenerativeOracle>, max_attempts: u32) -> Self {
        Self {
            oracle,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn generate(&self, context: &Context, mode: ResponseMode) -> Option<GeneratedContent> {
        match mode {
            ResponseMode::Reply => self.generate_reply(context).await,
            ResponseMode::Quote => self.generate_quote(context).await,
        }
    }

    pub async fn generate_reply(&self, context: &Context) -> Option<GeneratedContent> {
        for attempt in 1..=self.max_attempts {
            let draft = match self.oracle.compose_reply(context).await {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(attempt, error = %e, "Reply composition failed");
                    continue;
                }
            };
            match validate_reply(draft) {
                Ok(content) => {
                    info!(attempt, chars = post_length(&content.text), "Reply generated");
                    debug!(analysis = %content.analysis, text = %content.text, "Reply draft accepted");
                    return Some(content);
                }
                Err(reason) => warn!(attempt, %reason, "Reply draft rejected"),
            }
        }

        warn!(attempts = self.max_attempts, "Reply generation exhausted, nothing to post");
        None
    }

    pub async fn generate_quote(&self, context: &Context) -> Option<GeneratedContent> {
        for attempt in 1..=self.max_attempts {
            let draft = match self.oracle.compose_quote(context).await {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(attempt, error = %e, "Quote composition failed");
                    continue;
                }
            };
            match validate_quote(draft) {
                Ok(content) => {
                    info!(
                        attempt,
                        chars = post_length(&content.text),
                        thread = content.thread.len(),
                        "Quote generated"
                    );
                    debug!(analysis = %content.analysis, text = %content.text, "Quote draft accepted");
                    return Some(content);
                }
                Err(reason) => warn!(attempt, %reason, "Quote draft rejected"),
            }
        }

        warn!(attempts = self.max_attempts, "Quote generation exhausted, nothing to post");
        None
    }
}

/// Clean up and length-check a reply draft.
pub fn validate_reply(draft: ReplyDraft) -> Result<GeneratedContent, DraftRejection> {
    let text = check_primary(&draft.text)?;
    Ok(GeneratedContent {
        analysis: draft.analysis,
        text,
        thread: Vec::new(),
    })
}

/// Clean up and length-check a quote draft. One bad segment rejects the
/// whole draft; blank segments are dropped rather than rejected.
pub fn validate_quote(draft: QuoteDraft) -> Result<GeneratedContent, DraftRejection> {
    let text = check_primary(&draft.text)?;

    let mut thread = Vec::with_capacity(draft.thread.len());
    for (index, segment) in draft.thread.iter().enumerate() {
        let segment = strip_wrapping_quotes(segment.trim());
        if segment.is_empty() {
            continue;
        }
        let len = post_length(segment);
        if len > MAX_POST_CHARS {
            return Err(DraftRejection::SegmentTooLong { index, len });
        }
        thread.push(segment.to_string());
    }

    Ok(GeneratedContent {
        analysis: draft.analysis,
        text,
        thread,
    })
}

fn check_primary(raw: &str) -> Result<String, DraftRejection> {
    let text = strip_wrapping_quotes(raw.trim());
    if text.is_empty() {
        return Err(DraftRejection::EmptyText);
    }
    let len = post_length(text);
    if len > MAX_POST_CHARS {
        return Err(DraftRejection::TextTooLong(len));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOracle;
    use feedhound_common::Candidate;

    fn context() -> Context {
        Context::new(Candidate::new("5", "macrodog", "GDP up 3%"), None)
    }

    fn reply(text: &str) -> ReplyDraft {
        ReplyDraft {
            analysis: "a".into(),
            text: text.into(),
        }
    }

    fn quote(text: &str, thread: &[&str]) -> QuoteDraft {
        QuoteDraft {
            analysis: "a".into(),
            text: text.into(),
            thread: thread.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn reply_at_the_limit_is_accepted() {
        let content = validate_reply(reply(&"x".repeat(MAX_POST_CHARS))).unwrap();
        assert_eq!(post_length(&content.text), MAX_POST_CHARS);
        assert!(content.thread.is_empty());
    }

    #[test]
    fn reply_over_the_limit_is_rejected() {
        assert_eq!(
            validate_reply(reply(&"x".repeat(281))),
            Err(DraftRejection::TextTooLong(281))
        );
    }

    #[test]
    fn wrapping_quotes_are_stripped_before_counting() {
        let text = format!("\"{}\"", "x".repeat(MAX_POST_CHARS));
        let content = validate_reply(reply(&text)).unwrap();
        assert!(!content.text.starts_with('"'));
    }

    #[test]
    fn separately_quoted_words_survive_validation() {
        let text = "\"Buy\" the dip, they said \"safe\"";
        assert_eq!(validate_reply(reply(text)).unwrap().text, text);

        let segment = "\"Wow\" said the \"dog\"";
        let content = validate_quote(quote("'90s rates were 'normal'", &[segment])).unwrap();
        assert_eq!(content.text, "'90s rates were 'normal'");
        assert_eq!(content.thread, vec![segment.to_string()]);
    }

    #[test]
    fn blank_reply_is_rejected() {
        assert_eq!(validate_reply(reply("  ")), Err(DraftRejection::EmptyText));
    }

    #[test]
    fn one_long_segment_rejects_the_quote() {
        let long = "y".repeat(300);
        let result = validate_quote(quote("fine", &["ok", &long]));
        assert_eq!(result, Err(DraftRejection::SegmentTooLong { index: 1, len: 300 }));
    }

    #[test]
    fn blank_segments_are_dropped() {
        let content = validate_quote(quote("primary", &["one", "  ", "\"two\""])).unwrap();
        assert_eq!(content.thread, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn persistent_overlong_replies_give_nothing_to_post() {
        let long = "z".repeat(300);
        let oracle = Arc::new(
            MockOracle::new()
                .reply("a", &long)
                .reply("a", &long)
                .reply("a", &long),
        );
        let generator = ContentGenerator::new(oracle.clone(), 3);

        assert!(generator.generate_reply(&context()).await.is_none());
        assert_eq!(oracle.calls("compose_reply"), 3);
    }

    #[tokio::test]
    async fn retries_until_a_draft_fits() {
        let oracle = Arc::new(
            MockOracle::new()
                .reply("a", &"z".repeat(300))
                .reply("b", "Good boy economy"),
        );
        let generator = ContentGenerator::new(oracle.clone(), 3);

        let content = generator.generate(&context(), ResponseMode::Reply).await.unwrap();
        assert_eq!(content.text, "Good boy economy");
        assert_eq!(content.analysis, "b");
        assert_eq!(oracle.calls("compose_reply"), 2);
    }

    #[tokio::test]
    async fn oracle_errors_consume_attempts() {
        let oracle = Arc::new(MockOracle::new().reply_failure().reply_failure());
        let generator = ContentGenerator::new(oracle.clone(), 2);

        assert!(generator.generate_reply(&context()).await.is_none());
        assert_eq!(oracle.calls("compose_reply"), 2);
    }

    #[tokio::test]
    async fn quote_with_thread_is_generated() {
        let oracle = Arc::new(MockOracle::new().quote("a", "Headline take", &["first", "second"]));
        let generator = ContentGenerator::new(oracle, 3);

        let content = generator.generate(&context(), ResponseMode::Quote).await.unwrap();
        assert_eq!(content.text, "Headline take");
        assert_eq!(content.thread.len(), 2);
    }

    #[tokio::test]
    async fn quote_with_a_long_segment_is_retried_as_a_whole() {
        let long = "y".repeat(300);
        let oracle = Arc::new(
            MockOracle::new()
                .quote("a", "ok1", &["fine", &long])
                .quote("b", "ok2", &["fine"]),
        );
        let generator = ContentGenerator::new(oracle.clone(), 3);

        let content = generator.generate_quote(&context()).await.unwrap();
        assert_eq!(content.text, "ok2");
        assert_eq!(content.analysis, "b");
        assert_eq!(content.thread, vec!["fine".to_string()]);
        assert_eq!(oracle.calls("compose_quote"), 2);
    }

    #[tokio::test]
    async fn persistent_long_segments_give_nothing_to_post() {
        let long = "y".repeat(300);
        let oracle = Arc::new(
            MockOracle::new()
                .quote("a", "ok", &[&long])
                .quote("a", "ok", &[&long])
                .quote("a", "ok", &[&long]),
        );
        let generator = ContentGenerator::new(oracle.clone(), 3);

        assert!(generator.generate(&context(), ResponseMode::Quote).await.is_none());
        assert_eq!(oracle.calls("compose_quote"), 3);
    }
}
