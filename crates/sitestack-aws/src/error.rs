//! Mapping SDK errors onto provider errors.

use aws_sdk_s3::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata};
use aws_smithy_runtime_api::client::result::SdkError;
use sitestack_engine::ProviderError;

/// Service error codes meaning "the thing to delete is already gone".
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchBucketPolicy",
    "NoSuchWebsiteConfiguration",
    "NoSuchPublicAccessBlockConfiguration",
    "OwnershipControlsNotFoundError",
    "NoSuchTagSet",
    "NoSuchDistribution",
];

/// Convert an SDK error into [`ProviderError::Api`], keeping the service
/// error code when there is one.
pub(crate) fn sdk_error<E, R>(operation: &'static str) -> impl FnOnce(SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    move |err| {
        let code = err.code().unwrap_or("Unknown").to_owned();
        let message = match err.message() {
            Some(message) => message.to_owned(),
            None => DisplayErrorContext(&err).to_string(),
        };
        ProviderError::api(operation, code, message)
    }
}

/// Convert a request builder error.
pub(crate) fn invalid_request(operation: &'static str) -> impl FnOnce(BuildError) -> ProviderError {
    move |err| ProviderError::api(operation, "InvalidRequest", err.to_string())
}

/// Whether the error means the remote resource does not exist.
pub(crate) fn is_not_found(err: &ProviderError) -> bool {
    err.code().is_some_and(|code| NOT_FOUND_CODES.contains(&code))
}

/// Treat a missing remote resource as already deleted.
pub(crate) fn ignore_not_found(result: Result<(), ProviderError>) -> Result<(), ProviderError> {
    match result {
        Err(err) if is_not_found(&err) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_not_found_codes() {
        assert!(is_not_found(&ProviderError::api(
            "DeleteBucket",
            "NoSuchBucket",
            "gone"
        )));
        assert!(!is_not_found(&ProviderError::api(
            "DeleteBucket",
            "BucketNotEmpty",
            "objects remain"
        )));
        assert!(ignore_not_found(Err(ProviderError::api("DeleteObject", "NoSuchKey", ""))).is_ok());
        assert!(ignore_not_found(Err(ProviderError::api("PutBucketPolicy", "AccessDenied", ""))).is_err());
    }
}
