pub mod error;
pub mod types;

pub use error::{Result, XError};
pub use types::{
    ApiResponse, CreateTweetRequest, CreatedTweet, Includes, Media, ReferencedTweet, Tweet, User,
};

use std::time::Duration;

use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use types::CreateTweetResponse;

const BASE_URL: &str = "https://api.x.com/2";

const TWEET_FIELDS: &str =
    "created_at,text,author_id,note_tweet,referenced_tweets,public_metrics,attachments";
const LIST_EXPANSIONS: &str =
    "author_id,attachments.media_keys,referenced_tweets.id,referenced_tweets.id.author_id";
const LOOKUP_EXPANSIONS: &str = "author_id,attachments.media_keys";
const MEDIA_FIELDS: &str = "media_key,url,type";
const USER_FIELDS: &str = "username";

/// Longest we will park a request waiting for a rate-limit window to reset.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

pub struct XClient {
    client: reqwest::Client,
    bearer_token: String,
    user_token: Option<String>,
    base_url: String,
    wait_on_rate_limit: bool,
}

impl XClient {
    /// Read-only client authenticated with an app bearer token.
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer_token,
            user_token: None,
            base_url: BASE_URL.to_string(),
            wait_on_rate_limit: false,
        }
    }

    /// OAuth 2.0 user-context access token, required for creating posts.
    pub fn with_user_token(mut self, token: String) -> Self {
        self.user_token = Some(token);
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// On HTTP 429, sleep until the window resets and send the request once more.
    pub fn with_wait_on_rate_limit(mut self, wait: bool) -> Self {
        self.wait_on_rate_limit = wait;
        self
    }

    /// Most recent posts of a list, with author, media and referenced-post expansions.
    pub async fn list_tweets(
        &self,
        list_id: &str,
        max_results: u32,
    ) -> Result<ApiResponse<Vec<Tweet>>> {
        tracing::info!(list_id, max_results, "Fetching list tweets");

        let url = format!("{}/lists/{}/tweets", self.base_url, list_id);
        let max_results = max_results.to_string();
        let request = self.client.get(&url).bearer_auth(&self.bearer_token).query(&[
            ("max_results", max_results.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", LIST_EXPANSIONS),
            ("media.fields", MEDIA_FIELDS),
            ("user.fields", USER_FIELDS),
        ]);

        let page: ApiResponse<Vec<Tweet>> = self.read(request).await?;
        tracing::info!(
            count = page.data.as_ref().map_or(0, Vec::len),
            "Fetched list tweets"
        );
        Ok(page)
    }

    /// Look up a single post with its author and media expansions.
    pub async fn get_tweet(&self, id: &str) -> Result<ApiResponse<Tweet>> {
        let url = format!("{}/tweets/{}", self.base_url, id);
        let request = self.client.get(&url).bearer_auth(&self.bearer_token).query(&[
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", LOOKUP_EXPANSIONS),
            ("media.fields", MEDIA_FIELDS),
            ("user.fields", USER_FIELDS),
        ]);

        self.read(request).await
    }

    /// Create a post (plain, quote or reply, depending on `body`).
    pub async fn create_tweet(&self, body: &CreateTweetRequest) -> Result<CreatedTweet> {
        let token = self.user_token.as_deref().ok_or_else(|| {
            XError::Unauthenticated("creating posts requires a user access token".to_string())
        })?;

        let url = format!("{}/tweets", self.base_url);
        let request = self.client.post(&url).bearer_auth(token).json(body);

        let created: CreateTweetResponse = self.read(request).await?;
        tracing::debug!(id = %created.data.id, "Created post");
        Ok(created.data)
    }

    async fn read<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let retry = if self.wait_on_rate_limit {
            request.try_clone()
        } else {
            None
        };

        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            if let (Some(retry), Some(wait)) = (retry, rate_limit_wait(&response)) {
                tracing::warn!(wait_secs = wait.as_secs(), "Rate limited, waiting for reset");
                tokio::time::sleep(wait).await;
                return check_status(retry.send().await?).await;
            }
        }

        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(XError::RateLimited {
            reset_at: reset_header(&response),
        });
    }

    let message = response.text().await.unwrap_or_default();
    Err(XError::Api {
        status: status.as_u16(),
        message,
    })
}

fn reset_header(response: &Response) -> Option<i64> {
    response
        .headers()
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn rate_limit_wait(response: &Response) -> Option<Duration> {
    reset_header(response).map(|reset_at| wait_until(reset_at, Utc::now().timestamp()))
}

/// Time to wait for a reset at epoch second `reset_at`, plus a second of slack,
/// capped at [`MAX_RATE_LIMIT_WAIT`].
fn wait_until(reset_at: i64, now: i64) -> Duration {
    let secs = (reset_at - now).max(0) as u64 + 1;
    Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
}
