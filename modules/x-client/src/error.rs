use thiserror::Error;

pub type Result<T> = std::result::Result<T, XError>;

#[derive(Debug, Error)]
pub enum XError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited (resets at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credentials: {0}")]
    Unauthenticated(String),
}

impl XError {
    /// Whether the same request may succeed if simply sent again later.
    ///
    /// Connection problems, rate limits and server-side failures are
    /// transient; a rejected request (duplicate text, deleted target,
    /// bad credentials) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            XError::Network(_) | XError::RateLimited { .. } => true,
            XError::Api { status, .. } => *status >= 500,
            XError::Parse(_) | XError::Unauthenticated(_) => false,
        }
    }
}

impl From<reqwest::Error> for XError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            XError::Parse(err.to_string())
        } else {
            XError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for XError {
    fn from(err: serde_json::Error) -> Self {
        XError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(XError::Network("reset by peer".into()).is_transient());
        assert!(XError::RateLimited { reset_at: None }.is_transient());
        assert!(XError::Api { status: 503, message: String::new() }.is_transient());

        assert!(!XError::Api { status: 403, message: "duplicate content".into() }.is_transient());
        assert!(!XError::Parse("eof".into()).is_transient());
        assert!(!XError::Unauthenticated("X_USER_ACCESS_TOKEN".into()).is_transient());
    }
}
