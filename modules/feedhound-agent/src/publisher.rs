use std::sync::Arc;

use tracing::{info, warn};

use feedhound_common::{PostResult, PublishError};

use crate::retry::RetryPolicy;
use crate::traits::PostClient;

/// Outcome of posting a quote and its thread.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotePublication {
    pub primary: PostResult,
    /// Segments that made it out, in posting order.
    pub thread: Vec<PostResult>,
    /// Zero-based indices of segments that were given up on.
    pub failed_segments: Vec<usize>,
}

impl QuotePublication {
    /// The thread went out with holes in it.
    pub fn is_degraded(&self) -> bool {
        !self.failed_segments.is_empty()
    }

    pub fn post_count(&self) -> usize {
        1 + self.thread.len()
    }
}

/// Sends generated content to the platform under a retry policy.
pub struct Publisher {
    client: Arc<dyn PostClient>,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(client: Arc<dyn PostClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Post `text` quoting `target_id`, then each thread segment as a reply
    /// to the most recent post that succeeded.
    ///
    /// Fails only if the primary post fails; segment failures are recorded
    /// in the returned publication.
    pub async fn post_quote(
        &self,
        target_id: &str,
        text: &str,
        thread: &[String],
    ) -> Result<QuotePublication, PublishError> {
        let primary = self
            .retry
            .run("quote post", |_| self.client.create_quote_post(target_id, text))
            .await?;
        info!(post_id = %primary.id, target_id, "Quote posted");

        let mut anchor = primary.id.clone();
        let mut posted = Vec::with_capacity(thread.len());
        let mut failed_segments = Vec::new();

        for (index, segment) in thread.iter().enumerate() {
            let parent = anchor.clone();
            let result = self
                .retry
                .run("thread segment", |_| self.client.create_reply_post(&parent, segment))
                .await;
            match result {
                Ok(post) => {
                    info!(post_id = %post.id, parent = %parent, segment = index, "Thread segment posted");
                    anchor = post.id.clone();
                    posted.push(post);
                }
                Err(e) => {
                    warn!(segment = index, parent = %parent, error = %e, "Thread segment skipped");
                    failed_segments.push(index);
                }
            }
        }

        let publication = QuotePublication {
            primary,
            thread: posted,
            failed_segments,
        };
        if publication.is_degraded() {
            warn!(
                post_id = %publication.primary.id,
                failed = ?publication.failed_segments,
                posted = publication.thread.len(),
                "Thread published with gaps"
            );
        }
        Ok(publication)
    }

    pub async fn post_reply(&self, target_id: &str, text: &str) -> Result<PostResult, PublishError> {
        let post = self
            .retry
            .run("reply post", |_| self.client.create_reply_post(target_id, text))
            .await?;
        info!(post_id = %post.id, target_id, "Reply posted");
        Ok(post)
    }
}
