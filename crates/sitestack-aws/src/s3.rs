//! S3 requests for buckets, bucket configuration, and objects.

use std::collections::BTreeMap;

use aws_sdk_s3::error::BuildError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    ObjectOwnership, OwnershipControls, OwnershipControlsRule, PublicAccessBlockConfiguration,
    Tag, Tagging, WebsiteConfiguration,
};
use sitestack_core::AwsRegion;
use sitestack_engine::{CreateResult, ProviderError};
use sitestack_model::endpoint::{
    bucket_arn, bucket_regional_domain_name, custom_website_endpoint, website_domain,
    website_endpoint,
};
use sitestack_model::s3::{
    BucketArgs, BucketObjectArgs, BucketPolicyArgs, OwnershipControlsArgs, PublicAccessBlockArgs,
    WebsiteConfigurationArgs,
};
use sitestack_model::{Attributes, ResourceProps, attrs};
use tracing::{debug, info};

use crate::error::{ignore_not_found, invalid_request, sdk_error};
use crate::provider::AwsProvider;

/// Region whose buckets must not carry a location constraint.
const DEFAULT_LOCATION: &str = "us-east-1";

/// Location constraint for `CreateBucket`, `None` in `us-east-1`.
#[must_use]
pub fn create_bucket_configuration(region: &AwsRegion) -> Option<CreateBucketConfiguration> {
    (region.as_str() != DEFAULT_LOCATION).then(|| {
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region.as_str()))
            .build()
    })
}

/// `PutBucketTagging` body.
pub fn tagging(tags: &BTreeMap<String, String>) -> Result<Tagging, BuildError> {
    let tag_set = tags
        .iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect::<Result<Vec<_>, _>>()?;
    Tagging::builder().set_tag_set(Some(tag_set)).build()
}

/// `PutBucketOwnershipControls` body.
pub fn ownership_controls(args: &OwnershipControlsArgs) -> Result<OwnershipControls, BuildError> {
    let rule = OwnershipControlsRule::builder()
        .object_ownership(ObjectOwnership::from(args.rule.object_ownership.as_str()))
        .build()?;
    OwnershipControls::builder().rules(rule).build()
}

/// `PutPublicAccessBlock` body.
#[must_use]
pub fn public_access_block(args: &PublicAccessBlockArgs) -> PublicAccessBlockConfiguration {
    PublicAccessBlockConfiguration::builder()
        .block_public_acls(args.block_public_acls)
        .ignore_public_acls(args.ignore_public_acls)
        .block_public_policy(args.block_public_policy)
        .restrict_public_buckets(args.restrict_public_buckets)
        .build()
}

/// `PutBucketWebsite` body.
pub fn website_configuration(
    args: &WebsiteConfigurationArgs,
) -> Result<WebsiteConfiguration, BuildError> {
    let index = IndexDocument::builder()
        .suffix(&args.index_document.suffix)
        .build()?;
    let error = args
        .error_document
        .as_ref()
        .map(|doc| ErrorDocument::builder().key(&doc.key).build())
        .transpose()?;
    Ok(WebsiteConfiguration::builder()
        .index_document(index)
        .set_error_document(error)
        .build())
}

/// Website endpoint of a bucket: the AWS hostname, or a virtual host of
/// the custom endpoint when one is configured.
#[must_use]
pub fn website_endpoint_for(bucket: &str, region: &AwsRegion, endpoint_url: Option<&str>) -> String {
    match endpoint_url {
        Some(url) => custom_website_endpoint(bucket, url),
        None => website_endpoint(bucket, region),
    }
}

impl AwsProvider {
    fn bucket_outputs(&self, bucket: &str) -> Attributes {
        Attributes::from([
            (attrs::ID.to_owned(), bucket.to_owned()),
            (attrs::ARN.to_owned(), bucket_arn(bucket)),
            (attrs::BUCKET.to_owned(), bucket.to_owned()),
            (
                attrs::BUCKET_REGIONAL_DOMAIN_NAME.to_owned(),
                bucket_regional_domain_name(bucket, &self.region),
            ),
        ])
    }

    fn id_outputs(id: &str) -> Attributes {
        Attributes::from([(attrs::ID.to_owned(), id.to_owned())])
    }

    pub(crate) async fn create_bucket(&self, args: &BucketArgs) -> Result<CreateResult, ProviderError> {
        self.s3
            .create_bucket()
            .bucket(&args.bucket)
            .set_create_bucket_configuration(create_bucket_configuration(&self.region))
            .send()
            .await
            .map_err(sdk_error("CreateBucket"))?;
        info!(bucket = %args.bucket, region = %self.region, "bucket created");

        if !args.tags.is_empty() {
            self.put_bucket_tags(args).await?;
        }
        Ok(CreateResult {
            id: args.bucket.clone(),
            outputs: self.bucket_outputs(&args.bucket),
        })
    }

    pub(crate) async fn put_bucket_tags(&self, args: &BucketArgs) -> Result<Attributes, ProviderError> {
        if args.tags.is_empty() {
            ignore_not_found(
                self.s3
                    .delete_bucket_tagging()
                    .bucket(&args.bucket)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(sdk_error("DeleteBucketTagging")),
            )?;
        } else {
            self.s3
                .put_bucket_tagging()
                .bucket(&args.bucket)
                .tagging(tagging(&args.tags).map_err(invalid_request("PutBucketTagging"))?)
                .send()
                .await
                .map_err(sdk_error("PutBucketTagging"))?;
        }
        Ok(self.bucket_outputs(&args.bucket))
    }

    pub(crate) async fn put_ownership_controls(
        &self,
        args: &OwnershipControlsArgs,
    ) -> Result<Attributes, ProviderError> {
        let controls =
            ownership_controls(args).map_err(invalid_request("PutBucketOwnershipControls"))?;
        self.s3
            .put_bucket_ownership_controls()
            .bucket(&args.bucket)
            .ownership_controls(controls)
            .send()
            .await
            .map_err(sdk_error("PutBucketOwnershipControls"))?;
        Ok(Self::id_outputs(&args.bucket))
    }

    pub(crate) async fn put_public_access_block(
        &self,
        args: &PublicAccessBlockArgs,
    ) -> Result<Attributes, ProviderError> {
        self.s3
            .put_public_access_block()
            .bucket(&args.bucket)
            .public_access_block_configuration(public_access_block(args))
            .send()
            .await
            .map_err(sdk_error("PutPublicAccessBlock"))?;
        Ok(Self::id_outputs(&args.bucket))
    }

    pub(crate) async fn put_website(
        &self,
        args: &WebsiteConfigurationArgs,
    ) -> Result<Attributes, ProviderError> {
        let website = website_configuration(args).map_err(invalid_request("PutBucketWebsite"))?;
        self.s3
            .put_bucket_website()
            .bucket(&args.bucket)
            .website_configuration(website)
            .send()
            .await
            .map_err(sdk_error("PutBucketWebsite"))?;

        let mut outputs = Self::id_outputs(&args.bucket);
        outputs.insert(
            attrs::WEBSITE_ENDPOINT.to_owned(),
            website_endpoint_for(&args.bucket, &self.region, self.endpoint_url.as_deref()),
        );
        outputs.insert(attrs::WEBSITE_DOMAIN.to_owned(), website_domain(&self.region));
        Ok(outputs)
    }

    pub(crate) async fn put_policy(&self, args: &BucketPolicyArgs) -> Result<Attributes, ProviderError> {
        self.s3
            .put_bucket_policy()
            .bucket(&args.bucket)
            .policy(&args.policy)
            .send()
            .await
            .map_err(sdk_error("PutBucketPolicy"))?;
        Ok(Self::id_outputs(&args.bucket))
    }

    pub(crate) async fn put_object(&self, args: &BucketObjectArgs) -> Result<Attributes, ProviderError> {
        let output = self
            .s3
            .put_object()
            .bucket(&args.bucket)
            .key(&args.key)
            .body(ByteStream::from(args.content.clone().into_bytes()))
            .set_content_type(args.content_type.clone())
            .send()
            .await
            .map_err(sdk_error("PutObject"))?;
        debug!(bucket = %args.bucket, key = %args.key, "object uploaded");

        let mut outputs = Self::id_outputs(&args.key);
        if let Some(etag) = output.e_tag() {
            outputs.insert(attrs::ETAG.to_owned(), etag.to_owned());
        }
        Ok(outputs)
    }

    /// Delete an S3 resource; already-missing resources count as deleted.
    pub(crate) async fn delete_s3(&self, props: &ResourceProps) -> Result<(), ProviderError> {
        let result = match props {
            ResourceProps::Bucket(args) => self
                .s3
                .delete_bucket()
                .bucket(&args.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeleteBucket")),
            ResourceProps::OwnershipControls(args) => self
                .s3
                .delete_bucket_ownership_controls()
                .bucket(&args.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeleteBucketOwnershipControls")),
            ResourceProps::PublicAccessBlock(args) => self
                .s3
                .delete_public_access_block()
                .bucket(&args.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeletePublicAccessBlock")),
            ResourceProps::WebsiteConfiguration(args) => self
                .s3
                .delete_bucket_website()
                .bucket(&args.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeleteBucketWebsite")),
            ResourceProps::BucketPolicy(args) => self
                .s3
                .delete_bucket_policy()
                .bucket(&args.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeleteBucketPolicy")),
            ResourceProps::BucketObject(args) => self
                .s3
                .delete_object()
                .bucket(&args.bucket)
                .key(&args.key)
                .send()
                .await
                .map(|_| ())
                .map_err(sdk_error("DeleteObject")),
            ResourceProps::Distribution(_) => {
                return Err(ProviderError::Unsupported(props.kind()));
            }
        };
        ignore_not_found(result)
    }
}

#[cfg(test)]
mod tests {
    use sitestack_model::s3::{ErrorDocument as ErrorDoc, IndexDocument as IndexDoc};
    use sitestack_model::s3::{ObjectOwnership as Ownership, OwnershipControlsRule as Rule};

    use super::*;

    #[test]
    fn test_should_omit_location_constraint_in_us_east_1() {
        assert!(create_bucket_configuration(&AwsRegion::new("us-east-1")).is_none());
        let config = create_bucket_configuration(&AwsRegion::new("eu-central-1")).unwrap();
        assert_eq!(
            config.location_constraint().map(BucketLocationConstraint::as_str),
            Some("eu-central-1")
        );
    }

    #[test]
    fn test_should_build_tagging() {
        let tags = BTreeMap::from([
            ("ManagedBy".to_owned(), "SiteStack".to_owned()),
            ("Project".to_owned(), "StaticWebsite".to_owned()),
        ]);
        let tagging = tagging(&tags).unwrap();
        let keys: Vec<&str> = tagging.tag_set().iter().map(Tag::key).collect();
        assert_eq!(keys, vec!["ManagedBy", "Project"]);
    }

    #[test]
    fn test_should_build_ownership_controls() {
        let controls = ownership_controls(&OwnershipControlsArgs {
            bucket: "site".into(),
            rule: Rule {
                object_ownership: Ownership::BucketOwnerPreferred,
            },
        })
        .unwrap();
        assert_eq!(
            controls.rules()[0].object_ownership(),
            &ObjectOwnership::BucketOwnerPreferred
        );
    }

    #[test]
    fn test_should_build_permissive_public_access_block() {
        let config = public_access_block(&PublicAccessBlockArgs::permissive("site"));
        assert_eq!(config.block_public_acls(), Some(false));
        assert_eq!(config.ignore_public_acls(), Some(false));
        assert_eq!(config.block_public_policy(), Some(false));
        assert_eq!(config.restrict_public_buckets(), Some(false));
    }

    #[test]
    fn test_should_build_website_configuration() {
        let config = website_configuration(&WebsiteConfigurationArgs {
            bucket: "site".into(),
            index_document: IndexDoc {
                suffix: "index.html".into(),
            },
            error_document: Some(ErrorDoc {
                key: "error.html".into(),
            }),
        })
        .unwrap();
        assert_eq!(config.index_document().map(|d| d.suffix()), Some("index.html"));
        assert_eq!(config.error_document().map(|d| d.key()), Some("error.html"));
    }

    #[test]
    fn test_should_pick_website_endpoint_for_target() {
        let region = AwsRegion::new("us-east-1");
        assert_eq!(
            website_endpoint_for("site", &region, None),
            "site.s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            website_endpoint_for("site", &region, Some("http://localhost:4566")),
            "http://site.s3-website.localhost:4566"
        );
    }
}
