//! Configuration types and loading
//!
//! Config precedence: CLI `--config` > `CONFIG_PATH` env > `moodsync.toml`.
//! `MOODSYNC_API_BASE_URL` overrides `api.base_url` from the file, so one
//! config can be pointed at a local backend without editing it.

use moodsync_auth::{DEFAULT_EXPIRY_SKEW_SECS, TOKEN_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Env var overriding `api.base_url`
pub const BASE_URL_ENV: &str = "MOODSYNC_API_BASE_URL";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credential storage settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Token file; `~/` is expanded. Defaults to `$HOME/.moodsync/tokens.json`.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default = "default_expiry_skew")]
    pub expiry_skew_secs: u64,
    /// Sent with login so the backend can label the session
    #[serde(default)]
    pub device_name: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: None,
            expiry_skew_secs: default_expiry_skew(),
            device_name: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_expiry_skew() -> u64 {
    DEFAULT_EXPIRY_SKEW_SECS
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// After a successful load `auth.token_file` is always set, with `~/`
    /// expanded against `$HOME`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api.base_url = url.trim().to_owned();
        }

        if config.api.base_url.is_empty() {
            return Err(common::Error::Config(format!(
                "api.base_url is required (set it in the config file or {BASE_URL_ENV})"
            )));
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api.base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        let home = std::env::var_os("HOME").map(PathBuf::from);
        config.auth.token_file = Some(resolve_token_file(
            config.auth.token_file.take(),
            home.as_deref(),
        )?);

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("moodsync.toml")
    }

    /// Path of the persisted credential pair.
    pub fn token_file(&self) -> &Path {
        self.auth
            .token_file
            .as_deref()
            .unwrap_or(Path::new(TOKEN_FILE))
    }
}

fn resolve_token_file(configured: Option<PathBuf>, home: Option<&Path>) -> common::Result<PathBuf> {
    match configured {
        Some(path) => match path.strip_prefix("~") {
            Ok(rest) => {
                let home = home.ok_or_else(|| {
                    common::Error::Config("auth.token_file uses ~ but HOME is not set".into())
                })?;
                Ok(home.join(rest))
            }
            Err(_) => Ok(path),
        },
        None => {
            let home = home.ok_or_else(|| {
                common::Error::Config("HOME is not set; configure auth.token_file".into())
            })?;
            Ok(home.join(".moodsync").join(TOKEN_FILE))
        }
    }
}
