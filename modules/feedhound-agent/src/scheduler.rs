use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use futures::FutureExt;
use rand::Rng;
use tracing::{error, info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;

use feedhound_common::ResponseMode;

use crate::dedup::DedupStore;
use crate::enrichment::ContextEnricher;
use crate::generator::ContentGenerator;
use crate::planner::ResponsePlanner;
use crate::publisher::Publisher;
use crate::retry::RetryPolicy;
use crate::selection::SelectionEngine;
use crate::traits::{FeedSource, GenerativeOracle, MediaDescriber, PostClient, ResearchOracle};

/// Uniform jitter applied to the base interval, as a fraction either way.
pub const JITTER_FACTOR: f64 = 0.10;

/// Shortest sleep between cycles, whatever the configuration says.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the scheduler talks to, plus the retry budgets.
#[derive(Clone, TypedBuilder)]
pub struct AgentDeps {
    pub feed: Arc<dyn FeedSource>,
    pub describer: Arc<dyn MediaDescriber>,
    pub oracle: Arc<dyn GenerativeOracle>,
    pub research: Arc<dyn ResearchOracle>,
    pub posts: Arc<dyn PostClient>,
    #[builder(default = 3)]
    pub generation_attempts: u32,
    #[builder(default)]
    pub publish_retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    pub list_id: String,
    pub max_results: u32,
    pub base_interval: Duration,
}

/// How a cycle ended. Only `Posted` changes the dedup store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoCandidates,
    /// Everything fetched had already been answered.
    NothingNew,
    NoSelection,
    GenerationFailed,
    PublishFailed,
    Posted {
        candidate_id: String,
        mode: ResponseMode,
        /// Primary post plus any thread segments that went out.
        posts: usize,
        degraded: bool,
    },
    /// An error or panic escaped the cycle body.
    Failed { reason: String },
}

impl CycleOutcome {
    pub fn posted(&self) -> bool {
        matches!(self, CycleOutcome::Posted { .. })
    }
}

/// Drives fetch → dedup → select → enrich → plan → generate → publish,
/// once per jittered interval, forever.
///
/// Owns the dedup store, so cycles cannot overlap.
pub struct CycleScheduler {
    feed: Arc<dyn FeedSource>,
    describer: Arc<dyn MediaDescriber>,
    selection: SelectionEngine,
    enricher: ContextEnricher,
    planner: ResponsePlanner,
    generator: ContentGenerator,
    publisher: Publisher,
    config: CycleConfig,
    store: DedupStore,
    cycles: u64,
}

impl CycleScheduler {
    pub fn new(deps: AgentDeps, config: CycleConfig) -> Self {
        Self {
            feed: deps.feed,
            describer: deps.describer,
            selection: SelectionEngine::new(deps.oracle.clone()),
            enricher: ContextEnricher::new(deps.oracle.clone(), deps.research),
            planner: ResponsePlanner::new(deps.oracle.clone()),
            generator: ContentGenerator::new(deps.oracle, deps.generation_attempts),
            publisher: Publisher::new(deps.posts, deps.publish_retry),
            config,
            store: DedupStore::new(),
            cycles: 0,
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// One pass of the pipeline. Errors are returned, not absorbed; see
    /// [`run_guarded_cycle`](Self::run_guarded_cycle).
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let batch = self
            .feed
            .fetch_candidates(
                &self.config.list_id,
                self.config.max_results,
                self.describer.as_ref(),
            )
            .await
            .with_context(|| format!("Failed to fetch candidates from list {}", self.config.list_id))?;

        if batch.is_empty() {
            info!("Feed returned no candidates");
            return Ok(CycleOutcome::NoCandidates);
        }

        let fetched = batch.len();
        let pool = self.store.filter_unseen(batch);
        info!(fetched, unseen = pool.len(), seen = self.store.len(), "Candidates filtered");
        if pool.is_empty() {
            return Ok(CycleOutcome::NothingNew);
        }

        let Some(chosen) = self.selection.select(&pool).await else {
            return Ok(CycleOutcome::NoSelection);
        };
        let context = self.enricher.enrich(chosen.clone()).await;
        let mode = self.planner.plan(&context).await;

        let Some(content) = self.generator.generate(&context, mode).await else {
            return Ok(CycleOutcome::GenerationFailed);
        };

        let target = context.candidate.id.as_str();
        let outcome = match mode {
            ResponseMode::Reply => match self.publisher.post_reply(target, &content.text).await {
                Ok(_) => CycleOutcome::Posted {
                    candidate_id: target.to_string(),
                    mode,
                    posts: 1,
                    degraded: false,
                },
                Err(e) => {
                    warn!(candidate_id = target, error = %e, "Reply not published");
                    CycleOutcome::PublishFailed
                }
            },
            ResponseMode::Quote => {
                match self
                    .publisher
                    .post_quote(target, &content.text, &content.thread)
                    .await
                {
                    Ok(publication) => CycleOutcome::Posted {
                        candidate_id: target.to_string(),
                        mode,
                        posts: publication.post_count(),
                        degraded: publication.is_degraded(),
                    },
                    Err(e) => {
                        warn!(candidate_id = target, error = %e, "Quote not published");
                        CycleOutcome::PublishFailed
                    }
                }
            }
        };

        if outcome.posted() {
            self.store.mark_seen(target);
        }
        Ok(outcome)
    }

    /// [`run_cycle`](Self::run_cycle) with errors and panics turned into
    /// [`CycleOutcome::Failed`].
    pub async fn run_guarded_cycle(&mut self) -> CycleOutcome {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let reason = format!("{e:#}");
                error!(reason = %reason, "Cycle failed");
                CycleOutcome::Failed { reason }
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(reason = %reason, "Cycle panicked");
                CycleOutcome::Failed { reason }
            }
        }
    }

    /// Run cycles until the future is dropped.
    pub async fn run_forever(&mut self) {
        info!(
            list_id = %self.config.list_id,
            max_results = self.config.max_results,
            interval_secs = self.config.base_interval.as_secs(),
            "Scheduler starting"
        );
        loop {
            self.cycles += 1;
            let span = info_span!("cycle", n = self.cycles);
            let outcome = self.run_guarded_cycle().instrument(span.clone()).await;

            let sleep_for = jittered_interval(self.config.base_interval);
            span.in_scope(|| {
                info!(
                    outcome = ?outcome,
                    sleep_secs = sleep_for.as_secs(),
                    "Cycle complete"
                )
            });
            tokio::time::sleep(sleep_for).await;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// `base` scaled by `1 + factor`, never shorter than [`MIN_INTERVAL`].
pub fn apply_jitter(base: Duration, factor: f64) -> Duration {
    let secs = base.as_secs_f64() * (1.0 + factor);
    Duration::from_secs_f64(secs.max(MIN_INTERVAL.as_secs_f64()))
}

/// `base` ± [`JITTER_FACTOR`], uniformly distributed.
pub fn jittered_interval(base: Duration) -> Duration {
    let factor = rand::rng().random_range(-JITTER_FACTOR..=JITTER_FACTOR);
    apply_jitter(base, factor)
}
