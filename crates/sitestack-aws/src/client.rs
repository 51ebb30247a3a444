//! SDK client construction.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use sitestack_core::SiteStackConfig;
use tracing::info;

/// Build S3 and CloudFront clients for the configured region and endpoint.
///
/// Credentials come from the default AWS provider chain. Against a custom
/// endpoint without `AWS_ACCESS_KEY_ID` set, static `test`/`test`
/// credentials are used, which is what local emulators accept. S3 uses
/// path-style addressing whenever a custom endpoint is set.
pub async fn load_clients(
    config: &SiteStackConfig,
) -> (aws_sdk_s3::Client, aws_sdk_cloudfront::Client) {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.default_region.as_str().to_owned()));

    if let Some(endpoint) = &config.endpoint_url {
        info!(endpoint = %endpoint, "using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
        if std::env::var_os("AWS_ACCESS_KEY_ID").is_none() {
            loader = loader.credentials_provider(Credentials::new(
                "test",
                "test",
                None,
                None,
                "sitestack-endpoint",
            ));
        }
    }

    let shared = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(config.endpoint_url.is_some())
        .build();

    (
        aws_sdk_s3::Client::from_conf(s3_config),
        aws_sdk_cloudfront::Client::new(&shared),
    )
}
