//! Error types for the SiteStack core.

/// Core error type for SiteStack configuration and identity handling.
#[derive(Debug, thiserror::Error)]
pub enum SiteStackError {
    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be 12-digit numeric string)")]
    InvalidAccountId(String),

    /// Invalid AWS region identifier.
    #[error("invalid AWS region: {0}")]
    InvalidRegion(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for SiteStack core operations.
pub type SiteStackResult<T> = Result<T, SiteStackError>;
