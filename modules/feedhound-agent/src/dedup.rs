use std::collections::HashSet;

use feedhound_common::Candidate;

/// Ids of candidates we have already answered during this process lifetime.
///
/// Owned by the scheduler; ids are never removed.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates whose id has not been marked seen, in their original order.
    pub fn filter_unseen(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| !self.seen.contains(&c.id))
            .collect()
    }

    pub fn mark_seen(&mut self, id: impl Into<String>) {
        self.seen.insert(id.into());
    }

    pub(crate) fn len(&self) -> usize {
        self.seen.len()
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn is_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn seen_candidates_leave_the_pool() {
        let mut store = DedupStore::new();
        store.mark_seen("A");

        let pool = store.filter_unseen(vec![
            Candidate::new("A", "cats", "cat meme"),
            Candidate::new("B", "dogs", "dog meme"),
        ]);

        assert_eq!(ids(&pool), vec!["B"]);
    }

    #[test]
    fn filtering_preserves_order_of_the_rest() {
        let mut store = DedupStore::new();
        store.mark_seen("2");
        store.mark_seen("4");

        let batch = (1..=6)
            .map(|i| Candidate::new(i.to_string(), "h", "t"))
            .collect();

        assert_eq!(ids(&store.filter_unseen(batch)), vec!["1", "3", "5", "6"]);
    }

    #[test]
    fn empty_store_passes_everything() {
        let store = DedupStore::new();
        let pool = store.filter_unseen(vec![Candidate::new("x", "h", "t")]);
        assert_eq!(pool.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let mut store = DedupStore::new();
        store.mark_seen("A");
        store.mark_seen("A".to_string());
        assert_eq!(store.len(), 1);
        assert!(store.is_seen("A"));
    }
}
