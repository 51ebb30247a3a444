//! Deployment configuration.
//!
//! All configuration is driven by environment variables. The stack program
//! itself embeds its resource values; this only controls *where* and *as
//! which stack* it gets deployed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{SiteStackError, SiteStackResult};
use crate::types::AwsRegion;

/// Global configuration for a SiteStack deployment.
///
/// # Examples
///
/// ```
/// use sitestack_core::SiteStackConfig;
///
/// let config = SiteStackConfig::builder().stack("prod".into()).build();
/// assert_eq!(config.project, "static-website");
/// assert!(config.state_file().ends_with("static-website.prod.json"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SiteStackConfig {
    /// Project name, part of every resource URN.
    #[builder(default = String::from("static-website"))]
    pub project: String,

    /// Stack name (e.g. `dev`, `prod`), part of every resource URN.
    #[builder(default = String::from("dev"))]
    pub stack: String,

    /// Directory holding checkpoint files.
    #[builder(default = PathBuf::from(".sitestack"))]
    pub state_dir: PathBuf,

    /// Region resources are created in.
    #[builder(default)]
    pub default_region: AwsRegion,

    /// Custom AWS endpoint (LocalStack, RustStack, ...). `None` targets AWS.
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Upper bound, in seconds, on waiting for a disabled distribution to
    /// finish deploying before it can be deleted.
    #[builder(default = 1200)]
    pub deploy_timeout_secs: u64,
}

impl Default for SiteStackConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SiteStackConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SITESTACK_PROJECT` | `static-website` |
    /// | `SITESTACK_STACK` | `dev` |
    /// | `SITESTACK_STATE_DIR` | `.sitestack` |
    /// | `DEFAULT_REGION` (or `AWS_REGION`) | `us-east-1` |
    /// | `AWS_ENDPOINT_URL` | *(unset)* |
    /// | `LOG_LEVEL` | `info` |
    /// | `SITESTACK_DEPLOY_TIMEOUT_SECS` | `1200` |
    ///
    /// # Errors
    /// Returns [`SiteStackError::Config`] if `SITESTACK_DEPLOY_TIMEOUT_SECS`
    /// is not a whole number of seconds.
    pub fn from_env() -> SiteStackResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    /// Same as [`SiteStackConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SiteStackResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("SITESTACK_PROJECT") {
            config.project = v;
        }
        if let Some(v) = lookup("SITESTACK_STACK") {
            config.stack = v;
        }
        if let Some(v) = lookup("SITESTACK_STATE_DIR") {
            config.state_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DEFAULT_REGION").or_else(|| lookup("AWS_REGION")) {
            config.default_region = AwsRegion::new(v);
        }
        if let Some(v) = lookup("AWS_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("SITESTACK_DEPLOY_TIMEOUT_SECS") {
            config.deploy_timeout_secs = v.trim().parse().map_err(|_| {
                SiteStackError::Config(format!(
                    "SITESTACK_DEPLOY_TIMEOUT_SECS must be a whole number of seconds: {v:?}"
                ))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration values that end up in URNs and API calls.
    ///
    /// # Errors
    /// Returns [`SiteStackError::Config`] for an empty or non-identifier
    /// project/stack name, and [`SiteStackError::InvalidRegion`] for a
    /// malformed region.
    pub fn validate(&self) -> SiteStackResult<()> {
        for (field, value) in [("project", &self.project), ("stack", &self.stack)] {
            if value.is_empty()
                || !value
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
            {
                return Err(SiteStackError::Config(format!(
                    "{field} name must be non-empty and contain only letters, digits, '-', '_' or '.': {value:?}"
                )));
            }
        }
        AwsRegion::parse(self.default_region.as_str())?;
        Ok(())
    }

    /// Path of the checkpoint file for this project and stack.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir
            .join(format!("{}.{}.json", self.project, self.stack))
    }
}
