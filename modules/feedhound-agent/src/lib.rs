pub mod dedup;
pub mod enrichment;
pub mod generator;
pub mod infra;
pub mod planner;
pub mod publisher;
pub mod retry;
pub mod scheduler;
pub mod selection;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
