//! S3 resource declarations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::macros::wire_enum;
use crate::props::{DiffBuilder, PropertyDiff, ResourceArgs, ResourceProps};
use crate::urn::ResourceKind;
use crate::validation::{validate_bucket_name, validate_object_key, validate_tags};

/// An S3 bucket. ACLs are not managed; access is granted by policy only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketArgs {
    /// Bucket name. Left empty, the engine assigns `<logical-name>-<suffix>`
    /// on first apply and keeps it afterwards.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    /// Bucket tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl BucketArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .update_if("tags", self.tags != old.tags)
            .finish()
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        validate_bucket_name(&self.bucket)?;
        validate_tags(&self.tags)
    }
}

wire_enum! {
    /// Who owns objects written to a bucket.
    pub enum ObjectOwnership {
        /// The bucket owner owns objects uploaded with `bucket-owner-full-control`.
        BucketOwnerPreferred => "BucketOwnerPreferred",
        /// The uploading account owns the object.
        ObjectWriter => "ObjectWriter",
        /// ACLs are disabled and the bucket owner owns every object.
        BucketOwnerEnforced => "BucketOwnerEnforced",
    }
}

/// The single ownership rule of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipControlsRule {
    /// Ownership mode.
    pub object_ownership: ObjectOwnership,
}

/// Bucket ownership controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipControlsArgs {
    /// Target bucket name.
    pub bucket: String,
    /// Ownership rule.
    pub rule: OwnershipControlsRule,
}

impl OwnershipControlsArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .update_if("rule", self.rule != old.rule)
            .finish()
    }
}

/// Bucket-level public access block.
///
/// AWS defines exactly four boolean fields for this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PublicAccessBlockArgs {
    /// Target bucket name.
    pub bucket: String,
    /// Reject requests that carry public ACLs.
    pub block_public_acls: bool,
    /// Ignore public ACLs already present.
    pub ignore_public_acls: bool,
    /// Reject bucket policies that grant public access.
    pub block_public_policy: bool,
    /// Restrict access granted by public policies to AWS principals.
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlockArgs {
    /// A block with every flag disabled, so public policies are accepted.
    #[must_use]
    pub fn permissive(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            block_public_acls: false,
            ignore_public_acls: false,
            block_public_policy: false,
            restrict_public_buckets: false,
        }
    }

    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .update_if("blockPublicAcls", self.block_public_acls != old.block_public_acls)
            .update_if("ignorePublicAcls", self.ignore_public_acls != old.ignore_public_acls)
            .update_if(
                "blockPublicPolicy",
                self.block_public_policy != old.block_public_policy,
            )
            .update_if(
                "restrictPublicBuckets",
                self.restrict_public_buckets != old.restrict_public_buckets,
            )
            .finish()
    }
}

/// Index document of a website configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// Suffix appended to directory requests, e.g. `index.html`.
    pub suffix: String,
}

/// Error document of a website configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDocument {
    /// Object key returned for 4xx errors.
    pub key: String,
}

/// Static website hosting configuration of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteConfigurationArgs {
    /// Target bucket name.
    pub bucket: String,
    /// Index document.
    pub index_document: IndexDocument,
    /// Optional error document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_document: Option<ErrorDocument>,
}

impl WebsiteConfigurationArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .update_if("indexDocument", self.index_document != old.index_document)
            .update_if("errorDocument", self.error_document != old.error_document)
            .finish()
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        if self.index_document.suffix.is_empty() || self.index_document.suffix.contains('/') {
            return Err(ModelError::InvalidArgument {
                field: "indexDocument.suffix",
                message: "must be non-empty and must not contain '/'".to_owned(),
            });
        }
        if let Some(error_document) = &self.error_document {
            validate_object_key(&error_document.key)?;
        }
        Ok(())
    }
}

/// Bucket policy; `policy` is the serialized JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketPolicyArgs {
    /// Target bucket name.
    pub bucket: String,
    /// JSON policy document.
    pub policy: String,
}

impl BucketPolicyArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .update_if(
                "policy",
                !crate::policy::policies_equivalent(&self.policy, &old.policy),
            )
            .finish()
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        serde_json::from_str::<serde_json::Value>(&self.policy)?;
        Ok(())
    }
}

/// An object uploaded from inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketObjectArgs {
    /// Target bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object body.
    pub content: String,
    /// `Content-Type` stored with the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl BucketObjectArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        DiffBuilder::default()
            .replace_if("bucket", self.bucket != old.bucket)
            .replace_if("key", self.key != old.key)
            .update_if("content", self.content != old.content)
            .update_if("contentType", self.content_type != old.content_type)
            .finish()
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        validate_object_key(&self.key)
    }
}

macro_rules! impl_resource_args {
    ($($args:ty => $kind:ident),+ $(,)?) => {
        $(
            impl ResourceArgs for $args {
                const KIND: ResourceKind = ResourceKind::$kind;

                fn into_props(self) -> ResourceProps {
                    ResourceProps::$kind(self)
                }
            }
        )+
    };
}

impl_resource_args! {
    BucketArgs => Bucket,
    OwnershipControlsArgs => OwnershipControls,
    PublicAccessBlockArgs => PublicAccessBlock,
    WebsiteConfigurationArgs => WebsiteConfiguration,
    BucketPolicyArgs => BucketPolicy,
    BucketObjectArgs => BucketObject,
}
