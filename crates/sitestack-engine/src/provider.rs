//! The provider seam.
//!
//! A [`Provider`] performs the remote CRUD calls for every
//! [`ResourceKind`](sitestack_model::ResourceKind). The engine decides
//! *what* to call and in which order; providers only know *how*.

use async_trait::async_trait;
use sitestack_model::{Attributes, ModelError, ResourceKind, ResourceProps, Urn};

/// Result of creating a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    /// Provider-assigned identifier (bucket name, object key, distribution id).
    pub id: String,
    /// Attributes published to dependents, always including `id`.
    pub outputs: Attributes,
}

/// Errors returned by provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The remote API rejected the call.
    #[error("{operation}: {code}: {message}")]
    Api {
        /// API operation, e.g. `PutBucketPolicy`.
        operation: String,
        /// Service error code, e.g. `AccessDenied`.
        code: String,
        /// Service error message.
        message: String,
    },

    /// The provider does not manage this kind.
    #[error("{0} is not supported by this provider")]
    Unsupported(ResourceKind),

    /// The properties could not be turned into a request.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Gave up waiting for an asynchronous remote state change.
    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout {
        /// What was being waited on.
        what: String,
        /// Wait budget in seconds.
        seconds: u64,
    },
}

impl ProviderError {
    /// Build an [`Api`](Self::Api) error.
    pub fn api(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Service error code, if the remote API produced one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Remote CRUD for resolved resource properties.
///
/// Implementations must be safe to call concurrently for different
/// resources; the engine never issues two calls for the same URN at once.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Create the resource described by `props`.
    async fn create(&self, urn: &Urn, props: &ResourceProps) -> Result<CreateResult, ProviderError>;

    /// Change the resource `id` in place from `old` to `new`.
    ///
    /// Only called when [`ResourceProps::diff`] reports an in-place update.
    async fn update(
        &self,
        urn: &Urn,
        id: &str,
        old: &ResourceProps,
        new: &ResourceProps,
    ) -> Result<Attributes, ProviderError>;

    /// Delete the resource `id`, last known as `props`.
    ///
    /// Deleting something that is already gone succeeds.
    async fn delete(&self, urn: &Urn, id: &str, props: &ResourceProps) -> Result<(), ProviderError>;
}
