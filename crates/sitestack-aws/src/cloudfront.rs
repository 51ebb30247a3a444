//! CloudFront distribution requests.
//!
//! CloudFront lists are wrapped as `{Quantity, Items}`; the builders below
//! translate the flat declaration types into that shape.

use aws_sdk_cloudfront::error::BuildError;
use aws_sdk_cloudfront::types::{
    AllowedMethods, CachedMethods, CookiePreference, CustomErrorResponse, CustomErrorResponses,
    CustomOriginConfig, DefaultCacheBehavior, Distribution, DistributionConfig, ForwardedValues,
    GeoRestriction, GeoRestrictionType, ItemSelection, Method, Origin, OriginProtocolPolicy,
    OriginSslProtocols, Origins, PriceClass, Restrictions, SslProtocol, ViewerCertificate,
    ViewerProtocolPolicy,
};
use sitestack_engine::{CreateResult, ProviderError};
use sitestack_model::cloudfront::{self as model, DistributionArgs, HttpMethod};
use sitestack_model::{Attributes, attrs};
use tracing::{debug, info, warn};

use crate::error::{invalid_request, sdk_error};
use crate::provider::AwsProvider;

/// Status of a distribution whose last change has propagated.
pub const DEPLOYED: &str = "Deployed";

fn quantity(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn methods(list: &[HttpMethod]) -> Vec<Method> {
    list.iter().map(|m| Method::from(m.as_str())).collect()
}

fn origin(origin: &model::Origin) -> Result<Origin, BuildError> {
    let custom = origin
        .custom_origin_config
        .as_ref()
        .map(|config| {
            let protocols: Vec<SslProtocol> = config
                .origin_ssl_protocols
                .iter()
                .map(|p| SslProtocol::from(p.as_str()))
                .collect();
            CustomOriginConfig::builder()
                .http_port(i32::from(config.http_port))
                .https_port(i32::from(config.https_port))
                .origin_protocol_policy(OriginProtocolPolicy::from(
                    config.origin_protocol_policy.as_str(),
                ))
                .origin_ssl_protocols(
                    OriginSslProtocols::builder()
                        .quantity(quantity(protocols.len()))
                        .set_items(Some(protocols))
                        .build()?,
                )
                .build()
        })
        .transpose()?;

    Origin::builder()
        .id(&origin.origin_id)
        .domain_name(&origin.domain_name)
        .set_custom_origin_config(custom)
        .build()
}

// CloudFront still accepts legacy forwarded values and TTLs; the SDK marks
// them deprecated in favour of cache policies.
#[allow(deprecated)]
fn default_cache_behavior(
    behavior: &model::DefaultCacheBehavior,
) -> Result<DefaultCacheBehavior, BuildError> {
    let cached = methods(&behavior.cached_methods);
    let allowed = methods(&behavior.allowed_methods);
    let allowed_methods = AllowedMethods::builder()
        .quantity(quantity(allowed.len()))
        .set_items(Some(allowed))
        .cached_methods(
            CachedMethods::builder()
                .quantity(quantity(cached.len()))
                .set_items(Some(cached))
                .build()?,
        )
        .build()?;
    let forwarded_values = ForwardedValues::builder()
        .query_string(behavior.forwarded_values.query_string)
        .cookies(
            CookiePreference::builder()
                .forward(ItemSelection::from(
                    behavior.forwarded_values.cookies.forward.as_str(),
                ))
                .build()?,
        )
        .build()?;

    DefaultCacheBehavior::builder()
        .target_origin_id(&behavior.target_origin_id)
        .viewer_protocol_policy(ViewerProtocolPolicy::from(
            behavior.viewer_protocol_policy.as_str(),
        ))
        .allowed_methods(allowed_methods)
        .forwarded_values(forwarded_values)
        .min_ttl(behavior.min_ttl)
        .default_ttl(behavior.default_ttl)
        .max_ttl(behavior.max_ttl)
        .build()
}

fn custom_error_responses(
    responses: &[model::CustomErrorResponse],
) -> Result<CustomErrorResponses, BuildError> {
    let items = responses
        .iter()
        .map(|r| {
            CustomErrorResponse::builder()
                .error_code(i32::from(r.error_code))
                .set_response_code(r.response_code.map(|code| code.to_string()))
                .set_response_page_path(r.response_page_path.clone())
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;
    CustomErrorResponses::builder()
        .quantity(quantity(items.len()))
        .set_items(Some(items))
        .build()
}

/// Translate a declaration into a `DistributionConfig`.
///
/// `caller_reference` must be unique per create and must be kept unchanged
/// on every later update of the same distribution.
pub fn distribution_config(
    args: &DistributionArgs,
    caller_reference: &str,
) -> Result<DistributionConfig, BuildError> {
    let origins = args.origins.iter().map(origin).collect::<Result<Vec<_>, _>>()?;
    let geo = &args.restrictions.geo_restriction;

    DistributionConfig::builder()
        .caller_reference(caller_reference)
        .comment(&args.comment)
        .enabled(args.enabled)
        .set_default_root_object(args.default_root_object.clone())
        .origins(
            Origins::builder()
                .quantity(quantity(origins.len()))
                .set_items(Some(origins))
                .build()?,
        )
        .default_cache_behavior(default_cache_behavior(&args.default_cache_behavior)?)
        .custom_error_responses(custom_error_responses(&args.custom_error_responses)?)
        .price_class(PriceClass::from(args.price_class.as_str()))
        .restrictions(
            Restrictions::builder()
                .geo_restriction(
                    GeoRestriction::builder()
                        .restriction_type(GeoRestrictionType::from(geo.restriction_type.as_str()))
                        .quantity(quantity(geo.locations.len()))
                        .set_items((!geo.locations.is_empty()).then(|| geo.locations.clone()))
                        .build()?,
                )
                .build(),
        )
        .viewer_certificate(
            ViewerCertificate::builder()
                .cloud_front_default_certificate(
                    args.viewer_certificate.cloudfront_default_certificate,
                )
                .build(),
        )
        .build()
}

fn distribution_outputs(distribution: &Distribution, etag: Option<&str>) -> Attributes {
    let mut outputs = Attributes::from([
        (attrs::ID.to_owned(), distribution.id().to_owned()),
        (attrs::ARN.to_owned(), distribution.arn().to_owned()),
        (attrs::DOMAIN_NAME.to_owned(), distribution.domain_name().to_owned()),
        (attrs::STATUS.to_owned(), distribution.status().to_owned()),
    ]);
    if let Some(etag) = etag {
        outputs.insert(attrs::ETAG.to_owned(), etag.to_owned());
    }
    outputs
}

fn missing(operation: &'static str, what: &str) -> ProviderError {
    ProviderError::api(operation, "InvalidResponse", format!("response has no {what}"))
}

impl AwsProvider {
    pub(crate) async fn create_distribution(
        &self,
        args: &DistributionArgs,
    ) -> Result<CreateResult, ProviderError> {
        let caller_reference = format!("sitestack-{}", uuid::Uuid::new_v4());
        let config = distribution_config(args, &caller_reference)
            .map_err(invalid_request("CreateDistribution"))?;

        let output = self
            .cloudfront
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(sdk_error("CreateDistribution"))?;
        let distribution = output
            .distribution()
            .ok_or_else(|| missing("CreateDistribution", "distribution"))?;
        info!(
            distribution = %distribution.id(),
            domain = %distribution.domain_name(),
            "distribution created"
        );

        let mut outputs = distribution_outputs(distribution, output.e_tag());
        let id = distribution.id().to_owned();
        if args.wait_for_deployment {
            self.wait_deployed(&id).await?;
            outputs.insert(attrs::STATUS.to_owned(), DEPLOYED.to_owned());
        }
        Ok(CreateResult { id, outputs })
    }

    /// Fetch the current configuration and its `ETag`.
    async fn current_config(
        &self,
        id: &str,
        operation: &'static str,
    ) -> Result<(DistributionConfig, String), ProviderError> {
        let output = self
            .cloudfront
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(sdk_error(operation))?;
        let etag = output
            .e_tag()
            .ok_or_else(|| missing(operation, "ETag"))?
            .to_owned();
        let config = output
            .distribution_config()
            .ok_or_else(|| missing(operation, "distribution config"))?
            .clone();
        Ok((config, etag))
    }

    pub(crate) async fn update_distribution(
        &self,
        id: &str,
        args: &DistributionArgs,
    ) -> Result<Attributes, ProviderError> {
        let (current, etag) = self.current_config(id, "GetDistributionConfig").await?;
        let config = distribution_config(args, current.caller_reference())
            .map_err(invalid_request("UpdateDistribution"))?;

        let output = self
            .cloudfront
            .update_distribution()
            .id(id)
            .if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(sdk_error("UpdateDistribution"))?;
        let distribution = output
            .distribution()
            .ok_or_else(|| missing("UpdateDistribution", "distribution"))?;
        info!(distribution = %id, "distribution updated");

        let mut outputs = distribution_outputs(distribution, output.e_tag());
        if args.wait_for_deployment {
            self.wait_deployed(id).await?;
            outputs.insert(attrs::STATUS.to_owned(), DEPLOYED.to_owned());
        }
        Ok(outputs)
    }

    /// Disable the distribution, wait for the change to deploy, then delete it.
    pub(crate) async fn delete_distribution(&self, id: &str) -> Result<(), ProviderError> {
        let (mut config, etag) = match self.current_config(id, "GetDistributionConfig").await {
            Ok(current) => current,
            Err(err) if err.code() == Some("NoSuchDistribution") => {
                warn!(distribution = %id, "distribution already deleted");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let etag = if config.enabled() {
            config.enabled = false;
            let output = self
                .cloudfront
                .update_distribution()
                .id(id)
                .if_match(etag)
                .distribution_config(config)
                .send()
                .await
                .map_err(sdk_error("UpdateDistribution"))?;
            info!(distribution = %id, "distribution disabled");
            output
                .e_tag()
                .ok_or_else(|| missing("UpdateDistribution", "ETag"))?
                .to_owned()
        } else {
            etag
        };

        let etag = self.wait_deployed(id).await?.unwrap_or(etag);
        self.cloudfront
            .delete_distribution()
            .id(id)
            .if_match(etag)
            .send()
            .await
            .map_err(sdk_error("DeleteDistribution"))?;
        info!(distribution = %id, "distribution deleted");
        Ok(())
    }

    /// Wait, within the deploy timeout, until the distribution reports
    /// `Deployed`. Returns its latest `ETag`.
    async fn wait_deployed(&self, id: &str) -> Result<Option<String>, ProviderError> {
        tokio::time::timeout(self.deploy_timeout, self.poll_deployed(id))
            .await
            .map_err(|_| ProviderError::Timeout {
                what: format!("distribution {id} to deploy"),
                seconds: self.deploy_timeout.as_secs(),
            })?
    }

    async fn poll_deployed(&self, id: &str) -> Result<Option<String>, ProviderError> {
        loop {
            let output = self
                .cloudfront
                .get_distribution()
                .id(id)
                .send()
                .await
                .map_err(sdk_error("GetDistribution"))?;
            let status = output.distribution().map(Distribution::status);
            if status == Some(DEPLOYED) {
                return Ok(output.e_tag().map(str::to_owned));
            }
            debug!(distribution = %id, status = ?status, "waiting for deployment");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
