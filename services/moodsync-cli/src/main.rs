//! MoodSync command-line client
//!
//! 1. Loads `moodsync.toml` (see `config`)
//! 2. Opens the persisted token file
//! 3. Runs one subcommand through `moodsync-client`
//! 4. Prints the result as pretty JSON on stdout
//!
//! Logs go to stderr so command output stays pipeable.

mod commands;
mod config;
mod device;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use moodsync_auth::TokenStore;
use moodsync_client::ApiClient;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;
use crate::config::Config;

/// Log moods and work sessions against a MoodSync backend
#[derive(Parser)]
#[command(name = "moodsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: $CONFIG_PATH or ./moodsync.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_client(config: &Config) -> Result<ApiClient> {
    let store = TokenStore::file(config.token_file());
    ApiClient::builder()
        .base_url(&config.api.base_url)
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .expiry_skew_secs(config.auth.expiry_skew_secs)
        .token_store(Arc::new(store))
        .user_agent(concat!("moodsync-cli/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build API client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = Config::resolve_path(cli.config.as_deref());
    debug!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    debug!(
        base_url = %config.api.base_url,
        token_file = %config.token_file().display(),
        "configuration loaded"
    );

    let client = build_client(&config)?;
    let output = commands::run(cli.command, &client, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_parses_labels() {
        let cli = Cli::try_parse_from([
            "moodsync", "log", "--mood", "4", "--energy", "HIGH", "--task", "deep-work", "--good",
            "true",
        ])
        .unwrap();
        let Command::Log(args) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(args.mood, 4);
        assert_eq!(args.energy, moodsync_client::Energy::High);
        assert_eq!(args.task_type, moodsync_client::TaskType::DeepWork);
        assert_eq!(args.good, Some(true));
    }

    #[test]
    fn mood_out_of_range_rejected() {
        for mood in ["0", "6"] {
            let result = Cli::try_parse_from([
                "moodsync", "log", "--mood", mood, "--energy", "low", "--task", "rest",
            ]);
            assert!(result.is_err(), "mood {mood} should be rejected");
        }
    }

    #[test]
    fn unknown_task_type_rejected() {
        let result = Cli::try_parse_from([
            "moodsync", "log", "--mood", "3", "--energy", "low", "--task", "gaming",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn password_is_held_as_secret() {
        let cli = Cli::try_parse_from([
            "moodsync", "login", "--email", "ana@example.com", "--password", "hunter22",
        ])
        .unwrap();
        let Command::Login(args) = cli.command else {
            panic!("expected login command");
        };
        assert_eq!(args.credentials.password.expose(), "hunter22");
        assert_eq!(format!("{:?}", args.credentials.password), "[REDACTED]");
    }

    #[test]
    fn history_defaults_page_size() {
        let cli = Cli::try_parse_from(["moodsync", "history"]).unwrap();
        let Command::History(args) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(args.limit, moodsync_client::DEFAULT_PAGE_SIZE);
        assert!(args.cursor.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["moodsync", "status", "--config", "/tmp/m.toml", "--log-json"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/m.toml"));
        assert!(cli.log_json);
    }
}
