//! Integration tests for SiteStack.
//!
//! These tests require an S3 and CloudFront compatible server at
//! `localhost:4566` (override with `S3_ENDPOINT_URL`). They are marked
//! `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p sitestack-integration -- --ignored
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use sitestack_aws::AwsProvider;
use sitestack_core::SiteStackConfig;
use sitestack_engine::{Engine, FileStateStore, Stack};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create an S3 client pointing at the local server, for inspecting what a
/// deployment left behind.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// Generate a unique stack name for a test.
#[must_use]
pub fn test_stack_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// A deployment target with its own checkpoint directory.
#[derive(Debug)]
pub struct TestDeployment {
    /// Configuration pointing at the local server.
    pub config: SiteStackConfig,
    /// Engine over the AWS provider and a file checkpoint.
    pub engine: Engine,
    _state_dir: TempDir,
}

impl TestDeployment {
    /// Fresh, empty deployment of a uniquely named stack.
    pub async fn new(prefix: &str) -> anyhow::Result<Self> {
        init_tracing();

        let state_dir = tempfile::tempdir()?;
        let config = SiteStackConfig::builder()
            .stack(test_stack_name(prefix))
            .state_dir(state_dir.path().to_path_buf())
            .endpoint_url(Some(endpoint_url()))
            .deploy_timeout_secs(120)
            .build();

        let provider = AwsProvider::from_config(&config)
            .await
            .with_poll_interval(Duration::from_millis(500));
        let engine = Engine::new(
            Arc::new(provider),
            Arc::new(FileStateStore::for_config(&config)),
        );

        Ok(Self {
            config,
            engine,
            _state_dir: state_dir,
        })
    }

    /// The static website declared for this deployment's stack.
    pub fn site(&self) -> anyhow::Result<Stack> {
        let mut stack = Stack::from_config(&self.config);
        sitestack_site::static_website(&mut stack)?;
        Ok(stack)
    }

    /// Tear everything down, ignoring failures.
    pub async fn cleanup(&self) {
        if let Err(e) = self.engine.destroy().await {
            tracing::warn!(error = %e, "cleanup failed");
        }
    }
}

mod test_provider;
mod test_site;
