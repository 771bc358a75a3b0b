use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use feedhound_common::{PostResult, PublishError};
use x_client::{CreateTweetRequest, XClient, XError};

use crate::traits::PostClient;

/// Posts quotes and replies as the configured account.
pub struct XPublisher {
    client: Arc<XClient>,
    handle: String,
}

impl XPublisher {
    pub fn new(client: Arc<XClient>, handle: impl Into<String>) -> Self {
        Self {
            client,
            handle: handle.into(),
        }
    }

    async fn create(&self, body: CreateTweetRequest) -> Result<PostResult, PublishError> {
        let created = self.client.create_tweet(&body).await.map_err(publish_error)?;
        Ok(PostResult {
            id: created.id,
            text: created.text,
            created_at: Utc::now(),
            author_handle: self.handle.clone(),
        })
    }
}

#[async_trait]
impl PostClient for XPublisher {
    async fn create_quote_post(&self, target_id: &str, text: &str) -> Result<PostResult, PublishError> {
        self.create(CreateTweetRequest::quote(target_id, text)).await
    }

    async fn create_reply_post(&self, target_id: &str, text: &str) -> Result<PostResult, PublishError> {
        self.create(CreateTweetRequest::reply(target_id, text)).await
    }
}

fn publish_error(err: XError) -> PublishError {
    if err.is_transient() {
        PublishError::Transient(err.to_string())
    } else {
        PublishError::Rejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_errors_map_by_transience() {
        assert!(publish_error(XError::Network("reset".into())).is_transient());
        assert!(publish_error(XError::RateLimited { reset_at: Some(0) }).is_transient());
        assert!(publish_error(XError::Api { status: 502, message: String::new() }).is_transient());

        let rejected = publish_error(XError::Api {
            status: 403,
            message: "You are not allowed to create a Tweet with duplicate content.".into(),
        });
        assert!(matches!(rejected, PublishError::Rejected(ref m) if m.contains("duplicate")));
    }

    #[tokio::test]
    async fn missing_user_token_is_rejected_not_retried() {
        let publisher = XPublisher::new(Arc::new(XClient::new("bearer".into())), "feedhound");
        let result = publisher.create_reply_post("1", "woof").await;
        assert!(matches!(result, Err(PublishError::Rejected(_))));
    }
}
