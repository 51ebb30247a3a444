//! Argument validation for S3 declarations.
//!
//! Rules follow the
//! [Amazon S3 documentation](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html)
//! so that mistakes surface at plan time instead of halfway through an apply.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::ModelError;

/// Maximum number of tags allowed on a bucket.
const MAX_BUCKET_TAGS: usize = 50;

/// Maximum length of a tag key in characters.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum length of a tag value in characters.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Maximum object key length in bytes.
const MAX_KEY_BYTES: usize = 1024;

/// Minimum bucket name length.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

fn invalid_bucket(name: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

/// Validate an S3 bucket name.
///
/// Rules:
/// - 3-63 characters long
/// - Only lowercase letters, numbers, hyphens, and dots
/// - Must start and end with a letter or number
/// - No consecutive dots (`..`)
/// - Not formatted as an IPv4 address
/// - Must not start with `xn--` or `sthree-`, nor end with `-s3alias`
///
/// # Examples
///
/// ```
/// use sitestack_model::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("static-website-bucket-1a2b3c4").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), ModelError> {
    let len = name.len();

    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(invalid_bucket(
            name,
            format!(
                "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
            ),
        ));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid_bucket(
            name,
            "must only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    let first = name.as_bytes()[0];
    let last = name.as_bytes()[len - 1];
    if !(first.is_ascii_lowercase() || first.is_ascii_digit())
        || !(last.is_ascii_lowercase() || last.is_ascii_digit())
    {
        return Err(invalid_bucket(name, "must start and end with a letter or number"));
    }

    if name.contains("..") {
        return Err(invalid_bucket(name, "must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid_bucket(name, "must not be formatted as an IP address"));
    }

    if name.starts_with("xn--") || name.starts_with("sthree-") {
        return Err(invalid_bucket(name, "must not start with 'xn--' or 'sthree-'"));
    }

    if name.ends_with("-s3alias") {
        return Err(invalid_bucket(name, "must not end with '-s3alias'"));
    }

    Ok(())
}

/// Validate an S3 object key: 1-1024 bytes.
pub fn validate_object_key(key: &str) -> Result<(), ModelError> {
    if key.is_empty() || key.len() > MAX_KEY_BYTES {
        return Err(ModelError::InvalidObjectKey {
            key: key.to_owned(),
            reason: format!("must be between 1 and {MAX_KEY_BYTES} bytes long"),
        });
    }
    Ok(())
}

/// Validate a bucket tag set.
pub fn validate_tags(tags: &BTreeMap<String, String>) -> Result<(), ModelError> {
    let invalid = |message: String| ModelError::InvalidArgument {
        field: "tags",
        message,
    };

    if tags.len() > MAX_BUCKET_TAGS {
        return Err(invalid(format!(
            "at most {MAX_BUCKET_TAGS} tags are allowed, got {}",
            tags.len()
        )));
    }
    for (key, value) in tags {
        let key_len = key.chars().count();
        if key_len == 0 || key_len > MAX_TAG_KEY_LEN {
            return Err(invalid(format!(
                "tag key {key:?} must be between 1 and {MAX_TAG_KEY_LEN} characters"
            )));
        }
        if key.starts_with("aws:") {
            return Err(invalid(format!("tag key {key:?} uses the reserved 'aws:' prefix")));
        }
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(invalid(format!(
                "value of tag {key:?} exceeds {MAX_TAG_VALUE_LEN} characters"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_valid_bucket_names() {
        for name in ["abc", "my-bucket", "my.bucket.1", "static-website-bucket-0f3a9c1"] {
            assert!(validate_bucket_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_should_reject_bucket_names_out_of_length() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_should_reject_bucket_names_with_bad_characters() {
        assert!(validate_bucket_name("My-Bucket").is_err());
        assert!(validate_bucket_name("my_bucket").is_err());
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket-").is_err());
        assert!(validate_bucket_name("my..bucket").is_err());
    }

    #[test]
    fn test_should_reject_reserved_bucket_names() {
        assert!(validate_bucket_name("192.168.0.1").is_err());
        assert!(validate_bucket_name("xn--bucket").is_err());
        assert!(validate_bucket_name("sthree-bucket").is_err());
        assert!(validate_bucket_name("bucket-s3alias").is_err());
    }

    #[test]
    fn test_should_validate_object_keys() {
        assert!(validate_object_key("index.html").is_ok());
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(&"k".repeat(1025)).is_err());
    }

    #[test]
    fn test_should_validate_tags() {
        let ok = BTreeMap::from([("Project".to_owned(), "StaticWebsite".to_owned())]);
        assert!(validate_tags(&ok).is_ok());

        let reserved = BTreeMap::from([("aws:owner".to_owned(), "x".to_owned())]);
        assert!(validate_tags(&reserved).is_err());

        let long_value = BTreeMap::from([("k".to_owned(), "v".repeat(257))]);
        assert!(validate_tags(&long_value).is_err());

        let too_many: BTreeMap<String, String> =
            (0..51).map(|i| (format!("k{i}"), String::new())).collect();
        assert!(validate_tags(&too_many).is_err());
    }
}
