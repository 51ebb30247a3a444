//! CloudFront settings for a website origin.

use sitestack_model::cloudfront::{
    CookieForward, CookiePreference, CustomErrorResponse, CustomOriginConfig,
    DefaultCacheBehavior, DistributionArgs, ForwardedValues, GeoRestriction, GeoRestrictionType,
    HttpMethod, Origin, OriginProtocolPolicy, PriceClass, Restrictions, SslProtocol,
    ViewerCertificate, ViewerProtocolPolicy,
};

const READ_METHODS: [HttpMethod; 3] = [HttpMethod::Get, HttpMethod::Head, HttpMethod::Options];

/// A distribution in front of an S3 website endpoint.
///
/// `origin_id` names the single origin and is also the cache behavior's
/// target. `domain_name` must be the website hostname without a scheme;
/// website endpoints only speak HTTP, so the origin is `http-only` while
/// viewers are redirected to HTTPS.
#[must_use]
pub fn website_distribution(origin_id: String, domain_name: String) -> DistributionArgs {
    DistributionArgs {
        enabled: true,
        comment: String::new(),
        default_root_object: Some("index.html".to_owned()),
        origins: vec![Origin {
            origin_id: origin_id.clone(),
            domain_name,
            custom_origin_config: Some(CustomOriginConfig {
                origin_protocol_policy: OriginProtocolPolicy::HttpOnly,
                http_port: 80,
                https_port: 443,
                origin_ssl_protocols: vec![SslProtocol::TlsV1_2],
            }),
        }],
        default_cache_behavior: DefaultCacheBehavior {
            allowed_methods: READ_METHODS.to_vec(),
            cached_methods: READ_METHODS.to_vec(),
            target_origin_id: origin_id,
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
            response_page_path: Some("/error.html".to_owned()),
        }],
        wait_for_deployment: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_target_the_single_origin() {
        let d = website_distribution(
            "arn:aws:s3:::site".into(),
            "site.s3-website-us-east-1.amazonaws.com".into(),
        );
        assert_eq!(d.origins.len(), 1);
        assert_eq!(d.default_cache_behavior.target_origin_id, d.origins[0].origin_id);
        assert_eq!(d.origins[0].origin_id, "arn:aws:s3:::site");
    }

    #[test]
    fn test_should_serialize_cache_and_error_settings() {
        let value = serde_json::to_value(website_distribution(
            "origin".into(),
            "site.example".into(),
        ))
        .unwrap();

        let behavior = &value["defaultCacheBehavior"];
        assert_eq!(behavior["allowedMethods"], serde_json::json!(["GET", "HEAD", "OPTIONS"]));
        assert_eq!(behavior["cachedMethods"], serde_json::json!(["GET", "HEAD", "OPTIONS"]));
        assert_eq!(behavior["viewerProtocolPolicy"], "redirect-to-https");
        assert_eq!(behavior["minTtl"], 0);
        assert_eq!(behavior["defaultTtl"], 3600);
        assert_eq!(behavior["maxTtl"], 86400);
        assert_eq!(behavior["forwardedValues"]["queryString"], false);
        assert_eq!(behavior["forwardedValues"]["cookies"]["forward"], "none");

        let origin = &value["origins"][0]["customOriginConfig"];
        assert_eq!(origin["originProtocolPolicy"], "http-only");
        assert_eq!(origin["httpPort"], 80);
        assert_eq!(origin["httpsPort"], 443);
        assert_eq!(origin["originSslProtocols"], serde_json::json!(["TLSv1.2"]));

        assert_eq!(
            value["customErrorResponses"],
            serde_json::json!([{"errorCode": 404, "responseCode": 404, "responsePagePath": "/error.html"}])
        );
        assert_eq!(value["priceClass"], "PriceClass_100");
        assert_eq!(value["restrictions"]["geoRestriction"]["restrictionType"], "none");
        assert_eq!(value["defaultRootObject"], "index.html");
        assert_eq!(value["waitForDeployment"], false);
        assert_eq!(value["enabled"], true);
    }
}
