//! Error types shared across the loading engine.

use thiserror::Error;

/// Failure reported by a data-source fetch.
///
/// Stage code never lets one of these cross an await boundary unhandled: each
/// stage catches its own failures and records them in published state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Transport-level failure reaching the upstream store.
    #[error("network error: {0}")]
    Network(String),
    /// The upstream store asked us to back off.
    #[error("rate limited")]
    RateLimited {
        /// Seconds suggested by the upstream `Retry-After`, when present.
        retry_after: Option<u64>,
    },
    /// The repository does not exist or is not visible.
    #[error("repository not found")]
    NotFound,
    /// Anything the source could not classify further.
    #[error("{0}")]
    Other(String),
}

/// Uniform error representation surfaced by lazy-loader instances.
///
/// Producers may fail with any displayable error type; it is coerced into this
/// shape so consumers read one field regardless of the producer behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    /// Wrap a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable failure text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SourceError> for LoadError {
    fn from(err: SourceError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_coerce_to_load_errors() {
        let err = LoadError::from(SourceError::Network("socket closed".into()));
        assert_eq!(err.message(), "network error: socket closed");
        assert_eq!(
            LoadError::from(SourceError::NotFound),
            LoadError::new("repository not found")
        );
    }
}
