//! [`Provider`] implementation backed by the AWS SDK.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sitestack_core::{AwsRegion, SiteStackConfig};
use sitestack_engine::{CreateResult, Provider, ProviderError};
use sitestack_model::{Attributes, ResourceProps, Urn};
use tracing::{debug, instrument};

use crate::client::load_clients;

/// Interval between `GetDistribution` polls while waiting for deployment.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Provider that manages S3 and CloudFront resources through the AWS APIs.
#[derive(Clone)]
pub struct AwsProvider {
    pub(crate) s3: aws_sdk_s3::Client,
    pub(crate) cloudfront: aws_sdk_cloudfront::Client,
    pub(crate) region: AwsRegion,
    pub(crate) endpoint_url: Option<String>,
    pub(crate) deploy_timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl fmt::Debug for AwsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsProvider")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("deploy_timeout", &self.deploy_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl AwsProvider {
    /// Build a provider from existing clients.
    #[must_use]
    pub fn new(
        s3: aws_sdk_s3::Client,
        cloudfront: aws_sdk_cloudfront::Client,
        config: &SiteStackConfig,
    ) -> Self {
        Self {
            s3,
            cloudfront,
            region: config.default_region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            deploy_timeout: Duration::from_secs(config.deploy_timeout_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Load SDK configuration from the environment and build a provider.
    pub async fn from_config(config: &SiteStackConfig) -> Self {
        let (s3, cloudfront) = load_clients(config).await;
        Self::new(s3, cloudfront, config)
    }

    /// Override the deployment poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Region new buckets are created in.
    #[must_use]
    pub fn region(&self) -> &AwsRegion {
        &self.region
    }
}

#[async_trait]
impl Provider for AwsProvider {
    #[instrument(skip_all, fields(urn = %urn))]
    async fn create(&self, urn: &Urn, props: &ResourceProps) -> Result<CreateResult, ProviderError> {
        debug!(kind = %props.kind(), "create");
        match props {
            ResourceProps::Bucket(args) => self.create_bucket(args).await,
            ResourceProps::Distribution(args) => self.create_distribution(args).await,
            other => {
                let outputs = self.put_configuration(other).await?;
                let id = match other {
                    ResourceProps::BucketObject(args) => args.key.clone(),
                    _ => other.bucket().unwrap_or_default().to_owned(),
                };
                Ok(CreateResult { id, outputs })
            }
        }
    }

    #[instrument(skip_all, fields(urn = %urn, id = %id))]
    async fn update(
        &self,
        urn: &Urn,
        id: &str,
        _old: &ResourceProps,
        new: &ResourceProps,
    ) -> Result<Attributes, ProviderError> {
        debug!(kind = %new.kind(), "update");
        match new {
            ResourceProps::Bucket(args) => self.put_bucket_tags(args).await,
            ResourceProps::Distribution(args) => self.update_distribution(id, args).await,
            other => self.put_configuration(other).await,
        }
    }

    #[instrument(skip_all, fields(urn = %urn, id = %id))]
    async fn delete(&self, urn: &Urn, id: &str, props: &ResourceProps) -> Result<(), ProviderError> {
        debug!(kind = %props.kind(), "delete");
        match props {
            ResourceProps::Distribution(_) => self.delete_distribution(id).await,
            other => self.delete_s3(other).await,
        }
    }
}

impl AwsProvider {
    /// Write a bucket sub-resource or an object. Creating and updating
    /// these is the same idempotent `Put*` call.
    async fn put_configuration(&self, props: &ResourceProps) -> Result<Attributes, ProviderError> {
        match props {
            ResourceProps::OwnershipControls(args) => self.put_ownership_controls(args).await,
            ResourceProps::PublicAccessBlock(args) => self.put_public_access_block(args).await,
            ResourceProps::WebsiteConfiguration(args) => self.put_website(args).await,
            ResourceProps::BucketPolicy(args) => self.put_policy(args).await,
            ResourceProps::BucketObject(args) => self.put_object(args).await,
            ResourceProps::Bucket(_) | ResourceProps::Distribution(_) => {
                Err(ProviderError::Unsupported(props.kind()))
            }
        }
    }
}
