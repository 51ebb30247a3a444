//! IAM-shaped bucket policy documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::endpoint::objects_arn;
use crate::error::ModelError;
use crate::macros::wire_enum;

/// The only policy language version S3 accepts for new policies.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granting anonymous reads of objects.
pub const GET_OBJECT: &str = "s3:GetObject";

/// Action granting reads of the bucket website configuration.
pub const GET_BUCKET_WEBSITE: &str = "s3:GetBucketWebsite";

wire_enum! {
    /// Whether a statement allows or denies its actions.
    pub enum Effect {
        /// Grant the actions.
        Allow => "Allow",
        /// Refuse the actions.
        Deny => "Deny",
    }
}

/// Who a statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    /// A literal principal; `"*"` means everyone, including anonymous callers.
    Literal(String),
    /// Principals grouped by type, e.g. `{"AWS": "arn:aws:iam::123456789012:root"}`.
    Typed(BTreeMap<String, serde_json::Value>),
}

impl Principal {
    /// The anonymous, everyone principal.
    #[must_use]
    pub fn everyone() -> Self {
        Self::Literal("*".to_owned())
    }

    /// Whether this principal includes anonymous callers.
    #[must_use]
    pub fn is_everyone(&self) -> bool {
        match self {
            Self::Literal(p) => p == "*",
            Self::Typed(map) => map
                .get("AWS")
                .is_some_and(|v| v == "*" || v.as_array().is_some_and(|a| a.iter().any(|p| p == "*"))),
        }
    }
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Allow or deny.
    pub effect: Effect,
    /// Who the statement applies to.
    pub principal: Principal,
    /// The S3 action, e.g. `s3:GetObject`.
    pub action: String,
    /// The ARN (or ARN pattern) the action applies to.
    pub resource: String,
}

/// A bucket policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version.
    pub version: String,
    /// Statements, evaluated together.
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Public-read policy for a static website bucket: anonymous `GetObject`
    /// on every object and anonymous `GetBucketWebsite` on the bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitestack_model::policy::PolicyDocument;
    ///
    /// let json = PolicyDocument::public_read("arn:aws:s3:::site").to_json().unwrap();
    /// assert_eq!(
    ///     json,
    ///     r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject","Resource":"arn:aws:s3:::site/*"},{"Effect":"Allow","Principal":"*","Action":"s3:GetBucketWebsite","Resource":"arn:aws:s3:::site"}]}"#
    /// );
    /// ```
    #[must_use]
    pub fn public_read(bucket_arn: &str) -> Self {
        Self {
            version: POLICY_VERSION.to_owned(),
            statement: vec![
                Statement {
                    effect: Effect::Allow,
                    principal: Principal::everyone(),
                    action: GET_OBJECT.to_owned(),
                    resource: objects_arn(bucket_arn),
                },
                Statement {
                    effect: Effect::Allow,
                    principal: Principal::everyone(),
                    action: GET_BUCKET_WEBSITE.to_owned(),
                    resource: bucket_arn.to_owned(),
                },
            ],
        }
    }

    /// Parse a JSON policy.
    pub fn parse(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON, the form sent to `PutBucketPolicy`.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether any statement allows something to everyone.
    #[must_use]
    pub fn grants_public_access(&self) -> bool {
        self.statement
            .iter()
            .any(|s| s.effect == Effect::Allow && s.principal.is_everyone())
    }

    /// Whether the policy allows anonymous callers to perform `action` on `resource`.
    ///
    /// Only exact resources and trailing `*` wildcards are understood, which
    /// is all website policies use.
    #[must_use]
    pub fn allows_anonymous(&self, action: &str, resource: &str) -> bool {
        self.statement.iter().any(|s| {
            s.effect == Effect::Allow
                && s.principal.is_everyone()
                && s.action == action
                && match s.resource.strip_suffix('*') {
                    Some(prefix) => resource.starts_with(prefix),
                    None => s.resource == resource,
                }
        })
    }
}

/// Whether two policy strings are the same document, ignoring formatting.
#[must_use]
pub fn policies_equivalent(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARN: &str = "arn:aws:s3:::static-website-bucket-1a2b3c4";

    #[test]
    fn test_should_build_two_allow_statements_for_everyone() {
        let json = PolicyDocument::public_read(ARN).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["Version"], "2012-10-17");
        let statements = value["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);
        for s in statements {
            assert_eq!(s["Effect"], "Allow");
            assert_eq!(s["Principal"], "*");
        }
    }

    #[test]
    fn test_should_scope_object_and_website_statements() {
        let json = PolicyDocument::public_read(ARN).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let statements = value["Statement"].as_array().unwrap();

        let get_object = statements
            .iter()
            .find(|s| s["Action"] == "s3:GetObject")
            .unwrap();
        assert!(get_object["Resource"].as_str().unwrap().ends_with("/*"));

        let website = statements
            .iter()
            .find(|s| s["Action"] == "s3:GetBucketWebsite")
            .unwrap();
        assert_eq!(website["Resource"], ARN);
    }

    #[test]
    fn test_should_detect_public_grants() {
        let doc = PolicyDocument::public_read(ARN);
        assert!(doc.grants_public_access());
        assert!(doc.allows_anonymous(GET_OBJECT, &format!("{ARN}/index.html")));
        assert!(doc.allows_anonymous(GET_BUCKET_WEBSITE, ARN));
        assert!(!doc.allows_anonymous(GET_OBJECT, "arn:aws:s3:::other/index.html"));

        let private = PolicyDocument::parse(
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::123456789012:root"},"Action":"s3:GetObject","Resource":"x"}]}"#,
        )
        .unwrap();
        assert!(!private.grants_public_access());
    }

    #[test]
    fn test_should_compare_policies_ignoring_whitespace() {
        let compact = PolicyDocument::public_read(ARN).to_json().unwrap();
        let pretty = serde_json::to_string_pretty(&PolicyDocument::public_read(ARN)).unwrap();
        assert!(policies_equivalent(&compact, &pretty));
        assert!(!policies_equivalent(
            &compact,
            &PolicyDocument::public_read("arn:aws:s3:::other").to_json().unwrap()
        ));
    }
}
