//! SiteStack - deploy a static website to AWS.
//!
//! Declares the static website stack (S3 website bucket, public-read policy,
//! two pages, CloudFront distribution), diffs it against the stack's
//! checkpoint and applies the difference through the AWS APIs.
//!
//! # Usage
//!
//! ```text
//! sitestack preview
//! sitestack up
//! sitestack outputs --json
//! sitestack destroy
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SITESTACK_PROJECT` | `static-website` | Project name |
//! | `SITESTACK_STACK` | `dev` | Stack name |
//! | `SITESTACK_STATE_DIR` | `.sitestack` | Checkpoint directory |
//! | `DEFAULT_REGION` | `us-east-1` | Region for new buckets |
//! | `AWS_ENDPOINT_URL` | *(unset)* | Custom AWS-compatible endpoint |
//! | `SITESTACK_DEPLOY_TIMEOUT_SECS` | `1200` | Wait budget for distribution deletion |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sitestack_aws::AwsProvider;
use sitestack_core::SiteStackConfig;
use sitestack_engine::{Engine, FileStateStore, Stack};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

/// Version reported by `--version`.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Declare the static website for the configured project and stack.
fn declare(config: &SiteStackConfig) -> Result<Stack> {
    let mut stack = Stack::from_config(config);
    sitestack_site::static_website(&mut stack).context("failed to declare the static website")?;
    Ok(stack)
}

async fn build_engine(config: &SiteStackConfig) -> Engine {
    let provider = AwsProvider::from_config(config).await;
    let store = FileStateStore::for_config(config);
    Engine::new(Arc::new(provider), Arc::new(store))
}

fn render_outputs(outputs: &BTreeMap<String, String>, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(outputs).context("failed to serialize outputs");
    }
    let width = outputs.keys().map(String::len).max().unwrap_or(0);
    Ok(outputs
        .iter()
        .map(|(name, value)| format!("{name:<width$}  {value}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config().context("invalid environment configuration")?;

    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    info!(
        version = VERSION,
        project = %config.project,
        stack = %config.stack,
        region = %config.default_region,
        endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
        state = %config.state_file().display(),
        "starting sitestack",
    );

    let engine = build_engine(&config).await;
    match cli.command {
        Command::Preview => {
            let stack = declare(&config)?;
            let plan = engine.preview(&stack).await.context("preview failed")?;
            println!("{plan}");
        }
        Command::Up => {
            let stack = declare(&config)?;
            let summary = engine.up(&stack).await.context("update failed")?;
            println!("{summary}");
        }
        Command::Destroy => {
            let summary = engine.destroy().await.context("destroy failed")?;
            println!("{summary}");
        }
        Command::Outputs { json } => {
            let outputs = engine.outputs().await.context("failed to read outputs")?;
            println!("{}", render_outputs(&outputs, json)?);
        }
    }

    Ok(())
}
