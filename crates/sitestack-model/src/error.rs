//! Model error types.

use crate::urn::Urn;

/// Errors raised while declaring, resolving, or validating resources.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The value depends on a resource that has not been applied yet.
    #[error("value depends on {urn}, which is not known until it is applied")]
    Unknown {
        /// The resource whose attributes are not available.
        urn: Urn,
    },

    /// The resource was applied but did not publish the attribute.
    #[error("{urn} has no attribute {attribute:?}")]
    MissingAttribute {
        /// The resource that was read.
        urn: Urn,
        /// The attribute that was requested.
        attribute: String,
    },

    /// A URN string could not be parsed.
    #[error("invalid URN {0:?}")]
    InvalidUrn(String),

    /// A stack or project name is not usable inside a URN.
    #[error("invalid {segment} name {value:?}: {reason}")]
    InvalidSegment {
        /// Which segment was rejected, `stack` or `project`.
        segment: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A logical resource name is not usable inside a URN.
    #[error("invalid resource name {name:?}: {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The bucket name violates S3 naming rules.
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        name: String,
        /// The reason for the error.
        reason: String,
    },

    /// The object key violates S3 key rules.
    #[error("invalid object key {key:?}: {reason}")]
    InvalidObjectKey {
        /// The invalid key.
        key: String,
        /// The reason for the error.
        reason: String,
    },

    /// A resource argument is out of range or inconsistent.
    #[error("invalid {field}: {message}")]
    InvalidArgument {
        /// The argument that failed validation.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// JSON (de)serialization failure, e.g. of a policy document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Whether this error only means "not known yet" rather than a real failure.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}
