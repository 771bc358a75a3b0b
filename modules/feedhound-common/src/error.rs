use thiserror::Error;

/// Failure of a generative or research oracle call.
///
/// Every variant is absorbed by the pipeline into a safe default; the kinds
/// exist so logs say *why* a default was taken.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Unparseable oracle response: {0}")]
    Unparseable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single platform write.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Connectivity or platform-side trouble; the same post may succeed later.
    #[error("Transient publish failure: {0}")]
    Transient(String),

    /// The platform refused the post; sending it again will not help.
    #[error("Publish rejected: {0}")]
    Rejected(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}
