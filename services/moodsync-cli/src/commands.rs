//! Subcommands and their handlers
//!
//! Every handler returns a JSON value; `main` prints it. Tokens never appear
//! in the output.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use common::Secret;
use moodsync_client::{
    ApiClient, DEFAULT_PAGE_SIZE, Energy, LoginRequest, NewSession, RegisterRequest, TaskType,
};
use serde_json::{Value, json};

use crate::config::Config;
use crate::device;

#[derive(Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register(RegisterArgs),

    /// Sign in to an existing account
    Login(LoginArgs),

    /// Revoke the session and forget stored tokens
    Logout,

    /// Show whether a session is stored and still fresh
    Status,

    /// Log a work session
    Log(LogArgs),

    /// Today's mood, energy and focus totals
    Today,

    /// List past sessions, newest first
    History(HistoryArgs),

    /// Show one session in full
    Session {
        /// Session id as shown by `history`
        id: String,
    },

    /// Best deep-work windows and mood/energy insights
    Insights,

    /// What to work on next
    Recommend,

    /// Mark onboarding as complete
    Onboard,

    /// AI-written summary of the past week
    Summary,
}

#[derive(Args)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "MOODSYNC_PASSWORD", hide_env_values = true)]
    pub password: Secret<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    #[command(flatten)]
    pub credentials: Credentials,
}

#[derive(Args)]
pub struct LogArgs {
    /// Mood from 1 (awful) to 5 (great)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub mood: u8,

    /// low, medium or high
    #[arg(long)]
    pub energy: Energy,

    /// deep-work, study, light-work or rest
    #[arg(long = "task")]
    pub task_type: TaskType,

    /// Whether the session went well
    #[arg(long)]
    pub good: Option<bool>,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: u32,

    /// `next_cursor` from the previous page
    #[arg(long)]
    pub cursor: Option<String>,
}

/// Run `command` against `client`.
pub async fn run(command: Command, client: &ApiClient, config: &Config) -> Result<Value> {
    match command {
        Command::Register(args) => {
            let request = RegisterRequest::new(args.credentials.email, args.credentials.password)
                .with_name(args.first_name, args.last_name);
            let auth = client
                .auth()
                .register(&request)
                .await
                .context("registration failed")?;
            Ok(session_json(&auth))
        }
        Command::Login(args) => {
            let device_id = config
                .token_file()
                .parent()
                .map(device::load_or_create)
                .transpose()
                .context("failed to prepare device id")?;
            let request = LoginRequest::new(args.credentials.email, args.credentials.password)
                .with_device(config.auth.device_name.clone(), device_id);
            let auth = client.auth().login(&request).await.context("login failed")?;
            Ok(session_json(&auth))
        }
        Command::Logout => {
            client.auth().logout().await.context("logout failed")?;
            Ok(json!({ "logged_out": true }))
        }
        Command::Status => Ok(status_json(client, config)),
        Command::Log(args) => {
            let session = NewSession::new(args.mood, args.energy, args.task_type)?
                .with_good_session(args.good);
            let created = client.sessions().create(&session).await?;
            Ok(serde_json::to_value(created)?)
        }
        Command::Today => Ok(serde_json::to_value(client.sessions().today().await?)?),
        Command::History(args) => {
            let page = client
                .history()
                .list(args.limit, args.cursor.as_deref())
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        Command::Session { id } => Ok(serde_json::to_value(client.history().detail(&id).await?)?),
        Command::Insights => Ok(serde_json::to_value(client.insights().summary().await?)?),
        Command::Recommend => match client.recommendation().get().await? {
            Some(recommendation) => Ok(serde_json::to_value(recommendation)?),
            None => Ok(json!({
                "recommendation": null,
                "message": "Not enough history for a recommendation yet"
            })),
        },
        Command::Onboard => Ok(serde_json::to_value(client.onboarding().complete().await?)?),
        Command::Summary => Ok(serde_json::to_value(
            client.summary().weekly_summary().await?,
        )?),
    }
}

fn session_json(auth: &moodsync_client::AuthResponse) -> Value {
    json!({
        "user_id": auth.user_id,
        "expires_at": auth.expires_at,
        "has_onboarded": auth.has_onboarded,
    })
}

fn status_json(client: &ApiClient, config: &Config) -> Value {
    let watcher = client.watch();
    let access_expired = watcher
        .current()
        .and_then(|pair| {
            pair.access()
                .map(|access| moodsync_auth::is_expired(access, config.auth.expiry_skew_secs))
        })
        .unwrap_or(false);
    json!({
        "authenticated": watcher.is_authenticated(),
        "access_expired": access_expired,
        "base_url": client.base_url().as_str(),
        "token_file": config.token_file().display().to_string(),
    })
}
