//! Error types for provider clients.
//!
//! Application plumbing (config loading, the CLI, the server) uses
//! `anyhow::Result`. Provider clients return [`ProviderError`] so the
//! aggregator can record *why* a provider produced no data.

use std::time::Duration;

use thiserror::Error;

use taskflow_core::FailureKind;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("identity must not be empty")]
    InvalidIdentity,

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("account not found: {0}")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Serializable classification recorded in the aggregate's failure map.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::InvalidIdentity => FailureKind::InvalidIdentity,
            ProviderError::NotConfigured(_) => FailureKind::NotConfigured,
            ProviderError::NotFound(_) => FailureKind::NotFound,
            ProviderError::UpstreamUnavailable(_) => FailureKind::UpstreamUnavailable,
            ProviderError::Malformed(_) => FailureKind::Malformed,
            ProviderError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_projection() {
        assert_eq!(ProviderError::InvalidIdentity.kind(), FailureKind::InvalidIdentity);
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(3)).kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            ProviderError::NotFound("x".into()).kind(),
            FailureKind::NotFound
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ProviderError::Malformed("bad json".into()).to_string(),
            "malformed upstream response: bad json"
        );
    }
}
