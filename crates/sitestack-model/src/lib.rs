//! Resource model for SiteStack.
//!
//! Declarations are typed argument structs ([`s3`], [`cloudfront`]) whose
//! values may depend on attributes of other resources that only become known
//! once those resources are applied. Such values are carried as
//! [`Output<T>`]: a deferred computation that also records which resources
//! it reads from, so the engine can derive dependency edges from property
//! references alone.
//!
//! ```text
//! Output<String> (bucket arn) --apply--> Output<BucketPolicyArgs>
//!        |                                      |
//!        +---- dependencies: {bucket urn} ------+
//! ```

pub mod cloudfront;
pub mod endpoint;
pub mod error;
pub mod output;
pub mod policy;
pub mod props;
pub mod s3;
pub mod urn;
pub mod validation;

mod macros;

pub use error::ModelError;
pub use output::{Attributes, Output, OutputContext};
pub use props::{DiffKind, PropertyDiff, ResourceArgs, ResourceProps};
pub use urn::{ResourceKind, Urn};

/// Well-known attribute names published by providers.
pub mod attrs {
    /// Provider-assigned identifier.
    pub const ID: &str = "id";
    /// Amazon Resource Name.
    pub const ARN: &str = "arn";
    /// Bucket name.
    pub const BUCKET: &str = "bucket";
    /// Regional domain name of a bucket.
    pub const BUCKET_REGIONAL_DOMAIN_NAME: &str = "bucketRegionalDomainName";
    /// Static website endpoint of a bucket.
    pub const WEBSITE_ENDPOINT: &str = "websiteEndpoint";
    /// Static website domain of a bucket (the endpoint without the bucket label).
    pub const WEBSITE_DOMAIN: &str = "websiteDomain";
    /// Entity tag of an object or a distribution configuration.
    pub const ETAG: &str = "etag";
    /// Domain name of a distribution.
    pub const DOMAIN_NAME: &str = "domainName";
    /// Deployment status of a distribution.
    pub const STATUS: &str = "status";
}
