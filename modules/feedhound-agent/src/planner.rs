use std::sync::Arc;

use tracing::{info, warn};

use feedhound_common::{Context, ResponseMode};

use crate::traits::GenerativeOracle;

const DECISION_HEADER: &str = "### Decision ###";

/// Chooses between a reply (the default) and a quote post.
pub struct ResponsePlanner {
    oracle: Arc<dyn GenerativeOracle>,
}

impl ResponsePlanner {
    pub fn new(oracle: Arc<dyn GenerativeOracle>) -> Self {
        Self { oracle }
    }

    /// Quote only when the oracle clearly says so; anything else is a reply.
    pub async fn plan(&self, context: &Context) -> ResponseMode {
        let raw = match self.oracle.decide_mode(context).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Mode decision failed, defaulting to reply");
                return ResponseMode::Reply;
            }
        };

        match parse_mode(&raw) {
            Some(mode) => {
                info!(candidate_id = %context.candidate.id, mode = %mode, "Response mode decided");
                mode
            }
            None => {
                warn!(answer = %raw, "Unrecognized mode decision, defaulting to reply");
                ResponseMode::Reply
            }
        }
    }
}

/// Parse a decision token. Accepts the bare token or the sectioned
/// `### Decision ###` form, case-insensitively, with or without quotes.
pub fn parse_mode(raw: &str) -> Option<ResponseMode> {
    let answer = match raw.rfind(DECISION_HEADER) {
        Some(pos) => &raw[pos + DECISION_HEADER.len()..],
        None => raw,
    };
    let token = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .trim()
        .to_lowercase();

    match token.as_str() {
        "reply" => Some(ResponseMode::Reply),
        "quote" | "quote tweet" | "quote post" => Some(ResponseMode::Quote),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOracle;
    use feedhound_common::Candidate;

    fn context() -> Context {
        Context::new(Candidate::new("7", "chartguy", "CPI chart thread"), None)
    }

    #[test]
    fn sectioned_reply_is_reply() {
        assert_eq!(parse_mode("### Decision ###\nReply"), Some(ResponseMode::Reply));
    }

    #[test]
    fn quote_spellings() {
        assert_eq!(parse_mode("### Decision ###\n\"Quote Tweet\""), Some(ResponseMode::Quote));
        assert_eq!(parse_mode("quote"), Some(ResponseMode::Quote));
        assert_eq!(parse_mode(" QUOTE POST. "), Some(ResponseMode::Quote));
    }

    #[test]
    fn rambling_is_unrecognized() {
        assert_eq!(parse_mode("I think a reply would be best"), None);
        assert_eq!(parse_mode("### Decision ###"), None);
        assert_eq!(parse_mode(""), None);
    }

    #[tokio::test]
    async fn quote_when_oracle_says_quote() {
        let planner = ResponsePlanner::new(Arc::new(MockOracle::new().deciding("quote")));
        assert_eq!(planner.plan(&context()).await, ResponseMode::Quote);
    }

    #[tokio::test]
    async fn sectioned_reply_answer_plans_reply() {
        let oracle = MockOracle::new().deciding("### Decision ###\nReply");
        let planner = ResponsePlanner::new(Arc::new(oracle));
        assert!(!planner.plan(&context()).await.is_quote());
    }

    #[tokio::test]
    async fn oracle_failure_defaults_to_reply() {
        let planner = ResponsePlanner::new(Arc::new(MockOracle::new().failing_decision()));
        assert_eq!(planner.plan(&context()).await, ResponseMode::Reply);
    }

    #[tokio::test]
    async fn unrecognized_token_defaults_to_reply() {
        let planner = ResponsePlanner::new(Arc::new(MockOracle::new().deciding("retweet")));
        assert_eq!(planner.plan(&context()).await, ResponseMode::Reply);
    }
}
