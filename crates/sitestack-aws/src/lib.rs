//! AWS provider for SiteStack.
//!
//! [`AwsProvider`] implements [`Provider`](sitestack_engine::Provider) on top
//! of the AWS SDK. S3 configuration resources map one-to-one onto the
//! bucket sub-resource APIs (`PutBucketPolicy`, `PutPublicAccessBlock`, ...).
//! CloudFront updates use optimistic concurrency: every change fetches the
//! current `ETag` and passes it as `If-Match`. A distribution can only be
//! deleted once it is disabled and deployed, so deletion disables it first
//! and polls until the change has propagated.

mod client;
pub mod cloudfront;
mod error;
mod provider;
pub mod s3;

pub use client::load_clients;
pub use provider::AwsProvider;
