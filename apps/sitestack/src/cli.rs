//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sitestack_core::{SiteStackConfig, SiteStackResult};

#[derive(Debug, Parser)]
#[command(name = "sitestack")]
#[command(about = "Deploy a static website: S3 website bucket behind CloudFront")]
#[command(version = crate::VERSION)]
pub(crate) struct Cli {
    /// Stack name (overrides SITESTACK_STACK)
    #[arg(long, global = true)]
    pub(crate) stack: Option<String>,

    /// Directory holding checkpoint files (overrides SITESTACK_STATE_DIR)
    #[arg(long, global = true)]
    pub(crate) state_dir: Option<PathBuf>,

    /// Custom AWS endpoint, e.g. http://localhost:4566 (overrides AWS_ENDPOINT_URL)
    #[arg(long, global = true)]
    pub(crate) endpoint_url: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create or update the stack's resources
    Up,
    /// Show what `up` would change without changing anything
    Preview,
    /// Delete every resource recorded for the stack
    Destroy,
    /// Print the stack outputs of the last update
    Outputs {
        /// Print as a JSON object
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub(crate) fn config(&self) -> SiteStackResult<SiteStackConfig> {
        let mut config = SiteStackConfig::from_env()?;
        if let Some(stack) = &self.stack {
            config.stack.clone_from(stack);
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir.clone_from(dir);
        }
        if let Some(url) = &self.endpoint_url {
            config.endpoint_url = Some(url.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_should_verify_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_should_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "sitestack",
            "outputs",
            "--json",
            "--stack",
            "prod",
            "--state-dir",
            "/tmp/state",
        ]);
        assert!(matches!(cli.command, Command::Outputs { json: true }));

        let config = cli.config().unwrap();
        assert_eq!(config.stack, "prod");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
    }

    #[test]
    fn test_should_apply_endpoint_override() {
        let cli = Cli::parse_from(["sitestack", "--endpoint-url", "http://localhost:4566", "up"]);
        assert!(matches!(cli.command, Command::Up));
        assert_eq!(
            cli.config().unwrap().endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
    }
}
