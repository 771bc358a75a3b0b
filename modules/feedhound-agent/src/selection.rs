use std::sync::Arc;

use tracing::{info, warn};

use feedhound_common::Candidate;

use crate::traits::GenerativeOracle;

/// Picks the one candidate per cycle worth answering.
pub struct SelectionEngine {
    oracle: Arc<dyn GenerativeOracle>,
}

impl SelectionEngine {
    pub fn new(oracle: Arc<dyn GenerativeOracle>) -> Self {
        Self { oracle }
    }

    /// The winning candidate from `pool`, or `None` when the model declines,
    /// fails, or names something that is not in the pool.
    pub async fn select<'a>(&self, pool: &'a [Candidate]) -> Option<&'a Candidate> {
        if pool.is_empty() {
            return None;
        }

        let answer = match self.oracle.select_best(pool).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(pool = pool.len(), "Oracle declined to select a candidate");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Candidate selection failed");
                return None;
            }
        };

        let answer = answer.trim();
        match pool.iter().find(|c| c.id == answer) {
            Some(winner) => {
                info!(candidate_id = %winner.id, author = %winner.author_handle, "Selected candidate");
                Some(winner)
            }
            None => {
                warn!(answer, "Oracle selected an id that is not in the pool");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOracle;

    fn pool() -> Vec<Candidate> {
        vec![
            Candidate::new("1867", "cats", "cat meme"),
            Candidate::new("1868", "dogs", "dog meme"),
        ]
    }

    #[tokio::test]
    async fn returns_the_named_candidate() {
        let oracle = MockOracle::new().selecting(Some(" 1868\n"));
        let engine = SelectionEngine::new(Arc::new(oracle));
        let pool = pool();

        let winner = engine.select(&pool).await.unwrap();
        assert_eq!(winner.text, "dog meme");
    }

    #[tokio::test]
    async fn unknown_id_is_no_selection() {
        let oracle = MockOracle::new().selecting(Some("9999"));
        let engine = SelectionEngine::new(Arc::new(oracle));
        assert!(engine.select(&pool()).await.is_none());
    }

    #[tokio::test]
    async fn decline_is_no_selection() {
        let oracle = MockOracle::new().selecting(None);
        let engine = SelectionEngine::new(Arc::new(oracle));
        assert!(engine.select(&pool()).await.is_none());
    }

    #[tokio::test]
    async fn oracle_error_is_no_selection() {
        let oracle = MockOracle::new().failing_selection();
        let engine = SelectionEngine::new(Arc::new(oracle));
        assert!(engine.select(&pool()).await.is_none());
    }

    #[tokio::test]
    async fn empty_pool_skips_the_oracle() {
        let oracle = Arc::new(MockOracle::new().selecting(Some("1867")));
        let engine = SelectionEngine::new(oracle.clone());

        assert!(engine.select(&[]).await.is_none());
        assert_eq!(oracle.calls("select_best"), 0);
    }
}
