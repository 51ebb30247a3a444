//! ARN and endpoint derivation for S3 buckets.

use std::sync::LazyLock;

use regex::Regex;
use sitestack_core::AwsRegion;

/// Matches an `http://` or `https://` scheme at the start of a string.
static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("scheme pattern is valid"));

/// Regions whose website endpoints use the legacy `s3-website-<region>` form.
const DASH_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "eu-west-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// Remove a leading `http://` or `https://`; any other input passes through.
///
/// # Examples
///
/// ```
/// use sitestack_model::endpoint::strip_scheme;
///
/// assert_eq!(strip_scheme("http://site.s3-website-us-east-1.amazonaws.com"), "site.s3-website-us-east-1.amazonaws.com");
/// assert_eq!(strip_scheme("https://example.com/x"), "example.com/x");
/// assert_eq!(strip_scheme("example.com"), "example.com");
/// assert_eq!(strip_scheme("ftp://example.com"), "ftp://example.com");
/// ```
#[must_use]
pub fn strip_scheme(endpoint: &str) -> &str {
    match SCHEME.find(endpoint) {
        Some(m) => &endpoint[m.end()..],
        None => endpoint,
    }
}

/// ARN of a bucket.
#[must_use]
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// ARN pattern matching every object of a bucket.
#[must_use]
pub fn objects_arn(bucket_arn: &str) -> String {
    format!("{bucket_arn}/*")
}

/// Regional REST domain name of a bucket.
#[must_use]
pub fn bucket_regional_domain_name(bucket: &str, region: &AwsRegion) -> String {
    format!("{bucket}.s3.{region}.amazonaws.com")
}

/// Static website domain of a region.
#[must_use]
pub fn website_domain(region: &AwsRegion) -> String {
    if DASH_WEBSITE_REGIONS.contains(&region.as_str()) {
        format!("s3-website-{region}.amazonaws.com")
    } else {
        format!("s3-website.{region}.amazonaws.com")
    }
}

/// Static website endpoint of a bucket on AWS (a bare hostname).
#[must_use]
pub fn website_endpoint(bucket: &str, region: &AwsRegion) -> String {
    format!("{bucket}.{}", website_domain(region))
}

/// Static website endpoint of a bucket behind a custom endpoint URL.
///
/// Emulators serve websites on a virtual host under the same authority as
/// their API, so the result keeps the scheme of `endpoint_url`:
/// `http://localhost:4566` becomes `http://<bucket>.s3-website.localhost:4566`.
#[must_use]
pub fn custom_website_endpoint(bucket: &str, endpoint_url: &str) -> String {
    let authority = strip_scheme(endpoint_url).trim_end_matches('/');
    let scheme_len = endpoint_url.len() - strip_scheme(endpoint_url).len();
    let scheme = if scheme_len == 0 {
        "http://"
    } else {
        &endpoint_url[..scheme_len]
    };
    format!("{scheme}{bucket}.s3-website.{authority}")
}
