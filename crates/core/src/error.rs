use std::time::Duration;

use thiserror::Error;

/// Why a font could not be delivered to a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("font provider not found")]
    ProviderUnavailable,

    #[error("font provider certificates did not match")]
    CertificateMismatch,

    #[error("no font matched the request")]
    ResourceNotFound,

    #[error("font exists but is currently unavailable")]
    FontUnavailable,

    #[error("font query is malformed")]
    MalformedQuery,

    #[error("font could not be loaded")]
    LoadFailed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("loader rejected the request: {0}")]
    Rejected(String),
}

impl LoadError {
    /// Stable numeric code, matching the provider contract's fail reasons.
    pub fn code(&self) -> i32 {
        match self {
            LoadError::ProviderUnavailable => -1,
            LoadError::CertificateMismatch => -2,
            LoadError::LoadFailed => -3,
            LoadError::Timeout(_) => -4,
            LoadError::Rejected(_) => -5,
            LoadError::ResourceNotFound => 1,
            LoadError::FontUnavailable => 2,
            LoadError::MalformedQuery => 3,
        }
    }

    /// True for failures produced by the provider, as opposed to
    /// conditions local to one caller.
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, LoadError::Timeout(_) | LoadError::Rejected(_))
    }
}

/// Errors raised by a [`crate::FontProvider`] before it produces any result.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let all = [
            LoadError::ProviderUnavailable,
            LoadError::CertificateMismatch,
            LoadError::ResourceNotFound,
            LoadError::FontUnavailable,
            LoadError::MalformedQuery,
            LoadError::LoadFailed,
            LoadError::Timeout(Duration::from_millis(1)),
            LoadError::Rejected("x".into()),
        ];
        let mut codes: Vec<i32> = all.iter().map(LoadError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn timeout_is_caller_local() {
        assert!(!LoadError::Timeout(Duration::from_secs(1)).is_resolution_failure());
        assert!(LoadError::CertificateMismatch.is_resolution_failure());
    }
}
