//! Command-line and environment configuration using clap.
//!
//! Every option can also be supplied through a `PRJ_`-prefixed environment
//! variable, which is how the service is configured in deployment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use automation::{DefaultPlacement, RuleSet, RuleSetError};
use board::{BoardName, ColumnName};
use clap::{Parser, Subcommand, ValueEnum};
use github::{GithubClient, GithubConfig, DEFAULT_API_URL};

/// Projector: rule-driven GitHub project board automation
#[derive(Debug, Parser)]
#[command(name = "projector", version)]
#[command(about = "Rule-driven GitHub project board automation", long_about = None)]
pub struct Cli {
    /// GitHub token with org hook and project scopes
    #[arg(long, env = "PRJ_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Organisation whose boards and repositories are managed
    #[arg(long, env = "PRJ_ORG_NAME")]
    pub org_name: Option<String>,

    /// GitHub API root (override for GitHub Enterprise)
    #[arg(long, env = "PRJ_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bound on each GitHub request, in seconds
    #[arg(long, env = "PRJ_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Rules file; when unset `.prj.yaml` is searched in `.` then `$HOME/.prj`
    #[arg(long, env = "PRJ_RULES_PATH")]
    pub rules_path: Option<PathBuf>,

    /// Public URL GitHub should deliver webhooks to; registers an org hook at startup
    #[arg(long, env = "PRJ_HOOK_URL")]
    pub hook_url: Option<String>,

    /// Shared secret for verifying `X-Hub-Signature-256`
    #[arg(long, env = "PRJ_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Board every newly opened item is placed on
    #[arg(long, env = "PRJ_DEFAULT_PROJECT", requires = "default_column")]
    pub default_project: Option<String>,

    /// Column on the default board for newly opened items
    #[arg(long, env = "PRJ_DEFAULT_COLUMN", requires = "default_project")]
    pub default_column: Option<String>,

    /// Address the HTTP server binds to
    #[arg(long, env = "PRJ_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Seconds between scheduled report runs; 0 disables the timer
    #[arg(long, env = "PRJ_REPORT_INTERVAL_SECS", default_value_t = 0)]
    pub report_interval_secs: u64,

    /// OTLP gRPC endpoint for trace export
    #[arg(long, env = "PRJ_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "PRJ_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the webhook server (default)
    Serve,
    /// Generate reports for every open board once and print them as JSON
    Report,
    /// Load the rules file and print the parsed rules
    CheckRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Cli {
    pub fn selected_command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `None` when the report timer is disabled.
    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_interval_secs > 0).then(|| Duration::from_secs(self.report_interval_secs))
    }

    pub fn github_client(&self) -> Result<GithubClient> {
        let Some(token) = self.github_token.as_deref().filter(|t| !t.is_empty()) else {
            bail!("PRJ_GITHUB_TOKEN (or --github-token) is required");
        };
        let Some(org) = self.org_name.as_deref().filter(|o| !o.is_empty()) else {
            bail!("PRJ_ORG_NAME (or --org-name) is required");
        };
        let config = GithubConfig::new(org, token)
            .with_api_url(&self.api_url)
            .with_request_timeout(self.request_timeout());
        GithubClient::new(config).context("Failed to create GitHub client")
    }

    pub fn default_placement(&self) -> Result<Option<DefaultPlacement>> {
        match (&self.default_project, &self.default_column) {
            (Some(project), Some(column)) => {
                let board = BoardName::new(project.as_str())
                    .context("PRJ_DEFAULT_PROJECT must not be empty")?;
                let column = ColumnName::new(column.as_str())
                    .context("PRJ_DEFAULT_COLUMN must not be empty")?;
                Ok(Some(DefaultPlacement { board, column }))
            }
            _ => Ok(None),
        }
    }

    /// Loads the configured rules file, or searches the default locations.
    ///
    /// An explicitly configured path must exist.
    pub fn load_rules(&self) -> Result<RuleSet> {
        Ok(load_rules(self.rules_path.as_deref())?)
    }
}

pub fn load_rules(path: Option<&Path>) -> Result<RuleSet, RuleSetError> {
    match path {
        Some(path) => RuleSet::load(path),
        None => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            RuleSet::discover(&RuleSet::default_search_dirs(home.as_deref()))
        }
    }
}
