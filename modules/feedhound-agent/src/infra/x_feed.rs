use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use feedhound_common::{Candidate, NO_MEDIA_DESCRIPTION};
use x_client::{Includes, Tweet, XClient};

use crate::traits::{FeedSource, MediaDescriber};

/// Handle used when a post's author is missing from the expansions.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Feed source reading an X list timeline.
///
/// Posts that quote, reply to or repost another post are replaced by the
/// post they reference, keeping the list post's id as `original_id`.
pub struct XFeed {
    client: Arc<XClient>,
}

impl XFeed {
    pub fn new(client: Arc<XClient>) -> Self {
        Self { client }
    }

    /// The post a list entry should be judged by, plus the expansions that
    /// describe it. Falls back to the list entry when the lookup fails.
    async fn resolve(&self, tweet: Tweet, includes: &Includes) -> (Tweet, Option<String>, Includes) {
        let Some(reference) = tweet.first_reference() else {
            return (tweet, None, includes.clone());
        };
        let referenced_id = reference.id.clone();

        match self.client.get_tweet(&referenced_id).await {
            Ok(lookup) => match lookup.data {
                Some(resolved) => {
                    debug!(original = %tweet.id, resolved = %resolved.id, "Resolved referenced post");
                    let mut merged = lookup.includes;
                    merged.extend(includes.clone());
                    (resolved, Some(tweet.id), merged)
                }
                None => {
                    warn!(original = %tweet.id, referenced = %referenced_id, "Referenced post not returned");
                    (tweet, None, includes.clone())
                }
            },
            Err(e) => {
                warn!(original = %tweet.id, referenced = %referenced_id, error = %e, "Referenced post lookup failed");
                (tweet, None, includes.clone())
            }
        }
    }
}

#[async_trait]
impl FeedSource for XFeed {
    async fn fetch_candidates(
        &self,
        list_id: &str,
        max_results: u32,
        describer: &dyn MediaDescriber,
    ) -> Result<Vec<Candidate>> {
        let page = match self.client.list_tweets(list_id, max_results).await {
            Ok(page) => page,
            Err(e) => {
                warn!(list_id, error = %e, "List fetch failed, treating as empty");
                return Ok(Vec::new());
            }
        };
        for problem in &page.errors {
            debug!(title = ?problem.title, detail = ?problem.detail, "Partial error in list response");
        }

        let tweets = page.data.unwrap_or_default();
        let mut candidates = Vec::with_capacity(tweets.len());
        for tweet in tweets {
            let (tweet, original_id, includes) = self.resolve(tweet, &page.includes).await;
            let mut candidate = to_candidate(&tweet, original_id, &includes);
            describe_photos(&mut candidate, describer).await;
            candidates.push(candidate);
        }

        info!(list_id, count = candidates.len(), "Candidates fetched");
        Ok(candidates)
    }
}

/// Map a post and its expansions into a candidate, without media descriptions.
pub fn to_candidate(tweet: &Tweet, original_id: Option<String>, includes: &Includes) -> Candidate {
    let author_handle = tweet
        .author_id
        .as_deref()
        .and_then(|id| includes.username_for(id))
        .unwrap_or(UNKNOWN_AUTHOR);

    let mut candidate = Candidate::new(tweet.id.clone(), author_handle, tweet.full_text());
    candidate.original_id = original_id;
    candidate.media_urls = includes.photo_urls_for(tweet);
    candidate.engagement = tweet.public_metrics.clone().unwrap_or_default();
    candidate.created_at = tweet.created_at;
    candidate
}

async fn describe_photos(candidate: &mut Candidate, describer: &dyn MediaDescriber) {
    for url in &candidate.media_urls {
        let description = match describer.describe_media(url).await {
            Ok(description) => description,
            Err(e) => {
                warn!(url = %url, error = %e, "Media description failed");
                NO_MEDIA_DESCRIPTION.to_string()
            }
        };
        candidate.media_descriptions.push(description);
    }
}
