use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for every v2 read endpoint: primary data plus expansions.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

/// Objects pulled in through `expansions=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub tweets: Vec<Tweet>,
}

impl Includes {
    pub fn username_for(&self, author_id: &str) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.username.as_str())
    }

    /// Photo URLs attached to `tweet`, in attachment order.
    pub fn photo_urls_for(&self, tweet: &Tweet) -> Vec<String> {
        tweet
            .media_keys()
            .iter()
            .filter_map(|key| self.media.iter().find(|m| &m.media_key == key))
            .filter(|m| m.media_type == "photo")
            .filter_map(|m| m.url.clone())
            .collect()
    }

    /// Merge another response's expansions into this one.
    pub fn extend(&mut self, other: Includes) {
        self.users.extend(other.users);
        self.media.extend(other.media);
        self.tweets.extend(other.tweets);
    }
}

/// Partial error entries X returns alongside (or instead of) data.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Present for posts longer than the classic limit; carries the full text.
    pub note_tweet: Option<NoteTweet>,
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
    pub public_metrics: Option<BTreeMap<String, u64>>,
    pub attachments: Option<Attachments>,
}

impl Tweet {
    /// Long-form text when present, otherwise the classic text.
    pub fn full_text(&self) -> &str {
        self.note_tweet
            .as_ref()
            .map(|n| n.text.as_str())
            .unwrap_or(&self.text)
    }

    /// The first referenced post (quoted, replied-to or retweeted), if any.
    pub fn first_reference(&self) -> Option<&ReferencedTweet> {
        self.referenced_tweets.as_ref().and_then(|refs| refs.first())
    }

    pub fn media_keys(&self) -> &[String] {
        self.attachments
            .as_ref()
            .map(|a| a.media_keys.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteTweet {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferencedTweet {
    /// "quoted", "replied_to" or "retweeted".
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    pub media_key: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: Option<String>,
}

// --- Writes ---

/// Body for `POST /2/tweets`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyTarget>,
}

impl CreateTweetRequest {
    pub fn quote(quote_tweet_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote_tweet_id: Some(quote_tweet_id.into()),
            reply: None,
        }
    }

    pub fn reply(in_reply_to_tweet_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote_tweet_id: None,
            reply: Some(ReplyTarget {
                in_reply_to_tweet_id: in_reply_to_tweet_id.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyTarget {
    pub in_reply_to_tweet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateTweetResponse {
    pub data: CreatedTweet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"{
        "data": [
            {
                "id": "1001",
                "text": "short version",
                "author_id": "u1",
                "created_at": "2024-11-02T14:05:00.000Z",
                "note_tweet": { "text": "the much longer version of the post" },
                "public_metrics": { "like_count": 42, "retweet_count": 7 },
                "attachments": { "media_keys": ["3_1", "7_2"] }
            },
            {
                "id": "1002",
                "text": "look at this",
                "author_id": "u2",
                "referenced_tweets": [{ "type": "quoted", "id": "900" }]
            }
        ],
        "includes": {
            "users": [{ "id": "u1", "username": "pupdaily", "name": "Pup Daily" }],
            "media": [
                { "media_key": "3_1", "type": "photo", "url": "https://pbs.example/a.jpg" },
                { "media_key": "7_2", "type": "video" }
            ]
        }
    }"#;

    #[test]
    fn parses_list_page_with_expansions() {
        let page: ApiResponse<Vec<Tweet>> = serde_json::from_str(LIST_PAGE).unwrap();
        let tweets = page.data.unwrap();

        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].full_text(), "the much longer version of the post");
        assert_eq!(tweets[0].public_metrics.as_ref().unwrap()["like_count"], 42);
        assert_eq!(tweets[1].full_text(), "look at this");
        assert_eq!(tweets[1].first_reference().unwrap().id, "900");

        assert_eq!(page.includes.username_for("u1"), Some("pupdaily"));
        assert_eq!(page.includes.username_for("u2"), None);
        assert_eq!(
            page.includes.photo_urls_for(&tweets[0]),
            vec!["https://pbs.example/a.jpg".to_string()]
        );
    }

    #[test]
    fn create_request_omits_unused_targets() {
        let quote = serde_json::to_value(CreateTweetRequest::quote("55", "hot take")).unwrap();
        assert_eq!(quote["quote_tweet_id"], "55");
        assert!(quote.get("reply").is_none());

        let reply = serde_json::to_value(CreateTweetRequest::reply("56", "woof")).unwrap();
        assert_eq!(reply["reply"]["in_reply_to_tweet_id"], "56");
        assert!(reply.get("quote_tweet_id").is_none());
    }

    #[test]
    fn empty_page_has_no_data() {
        let page: ApiResponse<Vec<Tweet>> =
            serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(page.data.is_none());
        assert!(page.includes.users.is_empty());
    }
}
