//! Resource kinds and uniform resource names.
//!
//! A [`Urn`] identifies a declared resource across applies:
//! `urn:sitestack:<stack>::<project>::<type-token>::<name>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const URN_PREFIX: &str = "urn:sitestack:";

/// The resource types SiteStack knows how to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// S3 bucket.
    Bucket,
    /// S3 bucket ownership controls.
    OwnershipControls,
    /// S3 bucket public access block.
    PublicAccessBlock,
    /// S3 bucket static website configuration.
    WebsiteConfiguration,
    /// S3 bucket policy.
    BucketPolicy,
    /// S3 object.
    BucketObject,
    /// CloudFront distribution.
    Distribution,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Bucket,
        Self::OwnershipControls,
        Self::PublicAccessBlock,
        Self::WebsiteConfiguration,
        Self::BucketPolicy,
        Self::BucketObject,
        Self::Distribution,
    ];

    /// Type token used inside URNs.
    #[must_use]
    pub fn type_token(self) -> &'static str {
        match self {
            Self::Bucket => "aws:s3/bucketV2:BucketV2",
            Self::OwnershipControls => "aws:s3/bucketOwnershipControls:BucketOwnershipControls",
            Self::PublicAccessBlock => "aws:s3/bucketPublicAccessBlock:BucketPublicAccessBlock",
            Self::WebsiteConfiguration => {
                "aws:s3/bucketWebsiteConfigurationV2:BucketWebsiteConfigurationV2"
            }
            Self::BucketPolicy => "aws:s3/bucketPolicy:BucketPolicy",
            Self::BucketObject => "aws:s3/bucketObject:BucketObject",
            Self::Distribution => "aws:cloudfront/distribution:Distribution",
        }
    }

    /// Resolve a type token back to a kind.
    #[must_use]
    pub fn from_type_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_token() == token)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.type_token())
    }
}

/// Uniform resource name of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn {
    stack: String,
    project: String,
    kind: ResourceKind,
    name: String,
}

impl Urn {
    /// Build a URN, validating every segment.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidSegment`] for an empty stack or project, or
    /// one containing `:` or whitespace, and [`ModelError::InvalidName`] for an
    /// empty name or one containing `::` or whitespace.
    pub fn new(
        stack: impl Into<String>,
        project: impl Into<String>,
        kind: ResourceKind,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let stack = stack.into();
        let project = project.into();
        let name = name.into();
        validate_segment("stack", &stack)?;
        validate_segment("project", &project)?;
        validate_name(&name)?;
        Ok(Self {
            stack,
            project,
            kind,
            name,
        })
    }

    /// Stack segment.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Project segment.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Logical resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Stack and project sit between `::` separators, so a single `:` at either
/// end would merge with a separator and shift every later segment.
fn validate_segment(segment: &'static str, value: &str) -> Result<(), ModelError> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(':') {
        "must not contain ':'"
    } else if value.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(ModelError::InvalidSegment {
        segment,
        value: value.to_owned(),
        reason: reason.to_owned(),
    })
}

fn validate_name(name: &str) -> Result<(), ModelError> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name.contains("::") {
        "name must not contain '::'"
    } else if name.chars().any(char::is_whitespace) {
        "name must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(ModelError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    })
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{URN_PREFIX}{}::{}::{}::{}",
            self.stack,
            self.project,
            self.kind.type_token(),
            self.name
        )
    }
}

impl FromStr for Urn {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidUrn(s.to_owned());
        let rest = s.strip_prefix(URN_PREFIX).ok_or_else(invalid)?;
        let mut parts = rest.splitn(4, "::");
        let (Some(stack), Some(project), Some(token), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let kind = ResourceKind::from_type_token(token).ok_or_else(invalid)?;
        Self::new(stack, project, kind, name).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Urn {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.to_string()
    }
}
