//! Resolved resource properties and property diffing.

use serde::{Deserialize, Serialize};

use crate::cloudfront::DistributionArgs;
use crate::error::ModelError;
use crate::s3::{
    BucketArgs, BucketObjectArgs, BucketPolicyArgs, OwnershipControlsArgs, PublicAccessBlockArgs,
    WebsiteConfigurationArgs,
};
use crate::urn::ResourceKind;

/// Typed arguments of one resource kind.
pub trait ResourceArgs: Clone + Send + Sync + 'static {
    /// The kind these arguments declare.
    const KIND: ResourceKind;

    /// Wrap into the kind-erased property enum.
    fn into_props(self) -> ResourceProps;
}

/// Fully resolved properties of any supported resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties")]
pub enum ResourceProps {
    /// S3 bucket.
    Bucket(BucketArgs),
    /// Ownership controls.
    OwnershipControls(OwnershipControlsArgs),
    /// Public access block.
    PublicAccessBlock(PublicAccessBlockArgs),
    /// Website configuration.
    WebsiteConfiguration(WebsiteConfigurationArgs),
    /// Bucket policy.
    BucketPolicy(BucketPolicyArgs),
    /// Object.
    BucketObject(BucketObjectArgs),
    /// CloudFront distribution.
    Distribution(DistributionArgs),
}

impl ResourceProps {
    /// Kind of the resource these properties describe.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Bucket(_) => ResourceKind::Bucket,
            Self::OwnershipControls(_) => ResourceKind::OwnershipControls,
            Self::PublicAccessBlock(_) => ResourceKind::PublicAccessBlock,
            Self::WebsiteConfiguration(_) => ResourceKind::WebsiteConfiguration,
            Self::BucketPolicy(_) => ResourceKind::BucketPolicy,
            Self::BucketObject(_) => ResourceKind::BucketObject,
            Self::Distribution(_) => ResourceKind::Distribution,
        }
    }

    /// The bucket a resource lives in, if it is bucket-scoped.
    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Self::Bucket(a) => Some(&a.bucket),
            Self::OwnershipControls(a) => Some(&a.bucket),
            Self::PublicAccessBlock(a) => Some(&a.bucket),
            Self::WebsiteConfiguration(a) => Some(&a.bucket),
            Self::BucketPolicy(a) => Some(&a.bucket),
            Self::BucketObject(a) => Some(&a.bucket),
            Self::Distribution(_) => None,
        }
    }

    /// Check the properties against the provider's static rules.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Bucket(a) => a.validate(),
            Self::WebsiteConfiguration(a) => a.validate(),
            Self::BucketPolicy(a) => a.validate(),
            Self::BucketObject(a) => a.validate(),
            Self::Distribution(a) => a.validate(),
            Self::OwnershipControls(_) | Self::PublicAccessBlock(_) => Ok(()),
        }
    }

    /// Compare desired properties (`self`) with the recorded ones (`old`).
    ///
    /// Properties of different kinds always require replacement.
    #[must_use]
    pub fn diff(&self, old: &Self) -> PropertyDiff {
        match (self, old) {
            (Self::Bucket(new), Self::Bucket(old)) => new.diff(old),
            (Self::OwnershipControls(new), Self::OwnershipControls(old)) => new.diff(old),
            (Self::PublicAccessBlock(new), Self::PublicAccessBlock(old)) => new.diff(old),
            (Self::WebsiteConfiguration(new), Self::WebsiteConfiguration(old)) => new.diff(old),
            (Self::BucketPolicy(new), Self::BucketPolicy(old)) => new.diff(old),
            (Self::BucketObject(new), Self::BucketObject(old)) => new.diff(old),
            (Self::Distribution(new), Self::Distribution(old)) => new.diff(old),
            _ => DiffBuilder::default().replace_if("kind", true).finish(),
        }
    }
}

/// How a resource has to change to match its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffKind {
    /// Nothing to do.
    Same,
    /// Change in place.
    Update,
    /// Delete and recreate.
    Replace,
}

/// Result of a property comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDiff {
    /// Required change.
    pub kind: DiffKind,
    /// Names of the properties that differ, in declaration order.
    pub changed: Vec<&'static str>,
}

/// Accumulates per-field comparisons into a [`PropertyDiff`].
#[derive(Debug, Default)]
pub(crate) struct DiffBuilder {
    changed: Vec<&'static str>,
    replace: bool,
}

impl DiffBuilder {
    /// Record a field that can be changed in place.
    pub(crate) fn update_if(mut self, field: &'static str, differs: bool) -> Self {
        if differs {
            self.changed.push(field);
        }
        self
    }

    /// Record a field whose change forces replacement.
    pub(crate) fn replace_if(mut self, field: &'static str, differs: bool) -> Self {
        if differs {
            self.changed.push(field);
            self.replace = true;
        }
        self
    }

    pub(crate) fn finish(self) -> PropertyDiff {
        let kind = if self.replace {
            DiffKind::Replace
        } else if self.changed.is_empty() {
            DiffKind::Same
        } else {
            DiffKind::Update
        };
        PropertyDiff {
            kind,
            changed: self.changed,
        }
    }
}
