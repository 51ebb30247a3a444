//! CloudFront distribution declaration.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::macros::wire_enum;
use crate::props::{DiffBuilder, PropertyDiff, ResourceArgs, ResourceProps};
use crate::urn::ResourceKind;

wire_enum! {
    /// Protocol CloudFront uses to talk to a custom origin.
    pub enum OriginProtocolPolicy {
        /// Always HTTP (S3 website endpoints do not speak HTTPS).
        HttpOnly => "http-only",
        /// Same protocol the viewer used.
        MatchViewer => "match-viewer",
        /// Always HTTPS.
        HttpsOnly => "https-only",
    }
}

wire_enum! {
    /// Protocol policy applied to viewers.
    pub enum ViewerProtocolPolicy {
        /// Accept HTTP and HTTPS.
        AllowAll => "allow-all",
        /// Redirect HTTP to HTTPS.
        RedirectToHttps => "redirect-to-https",
        /// Reject HTTP.
        HttpsOnly => "https-only",
    }
}

wire_enum! {
    /// TLS versions CloudFront may negotiate with an origin.
    pub enum SslProtocol {
        /// SSL 3.0.
        SslV3 => "SSLv3",
        /// TLS 1.0.
        TlsV1 => "TLSv1",
        /// TLS 1.1.
        TlsV1_1 => "TLSv1.1",
        /// TLS 1.2.
        TlsV1_2 => "TLSv1.2",
    }
}

wire_enum! {
    /// HTTP methods a cache behavior handles.
    pub enum HttpMethod {
        /// `GET`
        Get => "GET",
        /// `HEAD`
        Head => "HEAD",
        /// `OPTIONS`
        Options => "OPTIONS",
        /// `PUT`
        Put => "PUT",
        /// `POST`
        Post => "POST",
        /// `PATCH`
        Patch => "PATCH",
        /// `DELETE`
        Delete => "DELETE",
    }
}

wire_enum! {
    /// Edge locations a distribution is served from.
    pub enum PriceClass {
        /// North America and Europe.
        PriceClass100 => "PriceClass_100",
        /// Adds Asia, Middle East, and Africa.
        PriceClass200 => "PriceClass_200",
        /// Every edge location.
        PriceClassAll => "PriceClass_All",
    }
}

wire_enum! {
    /// Geographic restriction mode.
    pub enum GeoRestrictionType {
        /// No restriction.
        None => "none",
        /// Only the listed countries.
        Whitelist => "whitelist",
        /// Everyone except the listed countries.
        Blacklist => "blacklist",
    }
}

wire_enum! {
    /// Which cookies are forwarded to the origin.
    pub enum CookieForward {
        /// No cookies.
        None => "none",
        /// Only the listed cookies.
        Whitelist => "whitelist",
        /// Every cookie.
        All => "all",
    }
}

/// Connection settings for a non-S3-REST origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOriginConfig {
    /// Origin protocol policy.
    pub origin_protocol_policy: OriginProtocolPolicy,
    /// HTTP port.
    pub http_port: u16,
    /// HTTPS port.
    pub https_port: u16,
    /// TLS versions allowed towards the origin.
    pub origin_ssl_protocols: Vec<SslProtocol>,
}

/// A backend the distribution fetches uncached content from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    /// Identifier referenced by cache behaviors.
    pub origin_id: String,
    /// Origin hostname, without scheme.
    pub domain_name: String,
    /// Custom origin settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_origin_config: Option<CustomOriginConfig>,
}

/// Cookie forwarding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiePreference {
    /// Forwarding mode.
    pub forward: CookieForward,
}

/// Request values forwarded to the origin (and part of the cache key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedValues {
    /// Whether the query string is forwarded.
    pub query_string: bool,
    /// Cookie forwarding.
    pub cookies: CookiePreference,
}

/// The cache behavior applied to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCacheBehavior {
    /// Methods CloudFront forwards.
    pub allowed_methods: Vec<HttpMethod>,
    /// Methods whose responses are cached.
    pub cached_methods: Vec<HttpMethod>,
    /// Origin the behavior routes to.
    pub target_origin_id: String,
    /// Viewer protocol policy.
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    /// Forwarded values.
    pub forwarded_values: ForwardedValues,
    /// Minimum TTL in seconds.
    pub min_ttl: i64,
    /// Default TTL in seconds.
    pub default_ttl: i64,
    /// Maximum TTL in seconds.
    pub max_ttl: i64,
}

/// Maps an origin error status to a custom response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomErrorResponse {
    /// Origin status code to intercept.
    pub error_code: u16,
    /// Status code returned to the viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    /// Path of the page returned instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_page_path: Option<String>,
}

/// Geographic restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRestriction {
    /// Restriction mode.
    pub restriction_type: GeoRestrictionType,
    /// ISO 3166-1 alpha-2 country codes.
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Distribution restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrictions {
    /// Geographic restriction.
    pub geo_restriction: GeoRestriction,
}

/// TLS certificate presented to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCertificate {
    /// Use the `*.cloudfront.net` certificate.
    pub cloudfront_default_certificate: bool,
}

/// A CloudFront distribution with a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionArgs {
    /// Whether the distribution accepts requests.
    pub enabled: bool,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
    /// Object returned for requests to `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,
    /// Origins.
    pub origins: Vec<Origin>,
    /// Default cache behavior.
    pub default_cache_behavior: DefaultCacheBehavior,
    /// Price class.
    pub price_class: PriceClass,
    /// Restrictions.
    pub restrictions: Restrictions,
    /// Viewer certificate.
    pub viewer_certificate: ViewerCertificate,
    /// Custom error responses.
    #[serde(default)]
    pub custom_error_responses: Vec<CustomErrorResponse>,
    /// Whether apply waits for the distribution to reach `Deployed`.
    #[serde(default)]
    pub wait_for_deployment: bool,
}

impl DistributionArgs {
    pub(crate) fn diff(&self, old: &Self) -> PropertyDiff {
        // wait_for_deployment only changes how an apply behaves, not the
        // remote configuration.
        DiffBuilder::default()
            .update_if("enabled", self.enabled != old.enabled)
            .update_if("comment", self.comment != old.comment)
            .update_if(
                "defaultRootObject",
                self.default_root_object != old.default_root_object,
            )
            .update_if("origins", self.origins != old.origins)
            .update_if(
                "defaultCacheBehavior",
                self.default_cache_behavior != old.default_cache_behavior,
            )
            .update_if("priceClass", self.price_class != old.price_class)
            .update_if("restrictions", self.restrictions != old.restrictions)
            .update_if(
                "viewerCertificate",
                self.viewer_certificate != old.viewer_certificate,
            )
            .update_if(
                "customErrorResponses",
                self.custom_error_responses != old.custom_error_responses,
            )
            .finish()
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        let invalid = |field: &'static str, message: String| {
            Err(ModelError::InvalidArgument { field, message })
        };

        if self.origins.is_empty() {
            return invalid("origins", "at least one origin is required".to_owned());
        }
        for origin in &self.origins {
            if origin.domain_name.is_empty() || origin.domain_name.contains("://") {
                return invalid(
                    "origins.domainName",
                    format!("must be a bare hostname, got {:?}", origin.domain_name),
                );
            }
        }

        let behavior = &self.default_cache_behavior;
        if !self
            .origins
            .iter()
            .any(|o| o.origin_id == behavior.target_origin_id)
        {
            return invalid(
                "defaultCacheBehavior.targetOriginId",
                format!("no origin with id {:?}", behavior.target_origin_id),
            );
        }
        if !(0 <= behavior.min_ttl
            && behavior.min_ttl <= behavior.default_ttl
            && behavior.default_ttl <= behavior.max_ttl)
        {
            return invalid(
                "defaultCacheBehavior",
                format!(
                    "TTLs must satisfy 0 <= min <= default <= max, got {}/{}/{}",
                    behavior.min_ttl, behavior.default_ttl, behavior.max_ttl
                ),
            );
        }
        if behavior
            .cached_methods
            .iter()
            .any(|m| !behavior.allowed_methods.contains(m))
        {
            return invalid(
                "defaultCacheBehavior.cachedMethods",
                "must be a subset of allowedMethods".to_owned(),
            );
        }

        for response in &self.custom_error_responses {
            if !(400..=599).contains(&response.error_code) {
                return invalid(
                    "customErrorResponses.errorCode",
                    format!("{} is not an error status", response.error_code),
                );
            }
            if let Some(path) = &response.response_page_path {
                if !path.starts_with('/') {
                    return invalid(
                        "customErrorResponses.responsePagePath",
                        format!("{path:?} must start with '/'"),
                    );
                }
            }
        }
        Ok(())
    }
}

impl ResourceArgs for DistributionArgs {
    const KIND: ResourceKind = ResourceKind::Distribution;

    fn into_props(self) -> ResourceProps {
        ResourceProps::Distribution(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::DiffKind;

    fn distribution() -> DistributionArgs {
        DistributionArgs {
            enabled: true,
            comment: String::new(),
            default_root_object: Some("index.html".into()),
            origins: vec![Origin {
                origin_id: "origin".into(),
                domain_name: "site.s3-website-us-east-1.amazonaws.com".into(),
                custom_origin_config: Some(CustomOriginConfig {
                    origin_protocol_policy: OriginProtocolPolicy::HttpOnly,
                    http_port: 80,
                    https_port: 443,
                    origin_ssl_protocols: vec![SslProtocol::TlsV1_2],
                }),
            }],
            default_cache_behavior: DefaultCacheBehavior {
                allowed_methods: vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Options],
                cached_methods: vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Options],
                target_origin_id: "origin".into(),
                viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
                forwarded_values: ForwardedValues {
                    query_string: false,
                    cookies: CookiePreference {
                        forward: CookieForward::None,
                    },
                },
                min_ttl: 0,
                default_ttl: 3600,
                max_ttl: 86400,
            },
            price_class: PriceClass::PriceClass100,
            restrictions: Restrictions {
                geo_restriction: GeoRestriction {
                    restriction_type: GeoRestrictionType::None,
                    locations: Vec::new(),
                },
            },
            viewer_certificate: ViewerCertificate {
                cloudfront_default_certificate: true,
            },
            custom_error_responses: vec![CustomErrorResponse {
                error_code: 404,
                response_code: Some(404),
                response_page_path: Some("/error.html".into()),
            }],
            wait_for_deployment: false,
        }
    }

    #[test]
    fn test_should_accept_website_distribution() {
        assert!(distribution().validate().is_ok());
    }

    #[test]
    fn test_should_reject_origin_with_scheme() {
        let mut d = distribution();
        d.origins[0].domain_name = "http://site.example".into();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_should_reject_unordered_ttls() {
        let mut d = distribution();
        d.default_cache_behavior.default_ttl = 100_000;
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_should_reject_unknown_target_origin() {
        let mut d = distribution();
        d.default_cache_behavior.target_origin_id = "missing".into();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_should_never_replace_distribution() {
        let mut changed = distribution();
        changed.price_class = PriceClass::PriceClassAll;
        changed.origins[0].domain_name = "other.example".into();
        let diff = changed.diff(&distribution());
        assert_eq!(diff.kind, DiffKind::Update);
        assert_eq!(diff.changed, vec!["origins", "priceClass"]);
    }

    #[test]
    fn test_should_ignore_wait_for_deployment_in_diff() {
        let mut changed = distribution();
        changed.wait_for_deployment = true;
        assert_eq!(changed.diff(&distribution()).kind, DiffKind::Same);
    }

    #[test]
    fn test_should_serialize_wire_values() {
        let value = serde_json::to_value(distribution()).unwrap();
        let behavior = &value["defaultCacheBehavior"];
        assert_eq!(behavior["viewerProtocolPolicy"], "redirect-to-https");
        assert_eq!(behavior["allowedMethods"], serde_json::json!(["GET", "HEAD", "OPTIONS"]));
        assert_eq!(
            value["origins"][0]["customOriginConfig"]["originSslProtocols"],
            serde_json::json!(["TLSv1.2"])
        );
        assert_eq!(value["priceClass"], "PriceClass_100");
    }
}
