//! Client configuration and durable storage
//!
//! Configuration is read from `config.toml` in the platform config directory,
//! then overridden field by field from `SHINCHOKU_*` environment variables
//! (a `.env` file is honoured).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod db;
pub mod storage;

pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};

use crate::api::constants::{DEFAULT_API_VERSION, DEFAULT_LOGIN_URL};

const APP_DIR: &str = "shinchoku-cli";
const ENV_PREFIX: &str = "SHINCHOKU_";

/// Everything the remote client needs to know before authenticating
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// OAuth consumer key
    pub client_id: String,
    pub login_url: String,
    pub redirect_uri: Option<String>,
    pub api_version: String,
    /// Same-origin proxy root; requests are rewritten to it when set
    pub proxy_url: Option<String>,
    /// Persist the session across restarts
    pub save_token_locally: bool,
    /// Host-supplied session for the embedded flow
    pub session_id: Option<String>,
    /// Host name the client runs under, used to derive the instance URL
    pub host: Option<String>,
    pub timeout_secs: u64,
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            redirect_uri: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            proxy_url: None,
            save_token_locally: true,
            session_id: None,
            host: None,
            timeout_secs: 30,
            storage_path: None,
        }
    }
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// Directory holding `config.toml` and the storage database
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join(APP_DIR)
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(format!(".{}", APP_DIR))
        };
        Ok(dir)
    }

    /// Load from the default location (or `path`), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_dir().ok().map(|dir| dir.join("config.toml")),
        };

        let mut config = match path {
            Some(ref path) if path.exists() => {
                log::debug!("Loading config from: {:?}", path);
                Self::from_toml_file(path)?
            }
            _ => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from a variable lookup (`CLIENT_ID`, `LOGIN_URL`, ...)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CLIENT_ID") {
            self.client_id = value;
        }
        if let Some(value) = lookup("LOGIN_URL") {
            self.login_url = value;
        }
        if let Some(value) = lookup("REDIRECT_URI") {
            self.redirect_uri = Some(value);
        }
        if let Some(value) = lookup("API_VERSION") {
            self.api_version = value;
        }
        if let Some(value) = lookup("PROXY_URL") {
            self.proxy_url = Some(value);
        }
        if let Some(value) = lookup("SAVE_TOKEN") {
            self.save_token_locally = parse_bool(&value)
                .with_context(|| format!("Invalid {}SAVE_TOKEN value: {}", ENV_PREFIX, value))?;
        }
        if let Some(value) = lookup("SESSION_ID") {
            self.session_id = Some(value);
        }
        if let Some(value) = lookup("HOST") {
            self.host = Some(value);
        }
        if let Some(value) = lookup("TIMEOUT_SECS") {
            self.timeout_secs = value
                .parse()
                .with_context(|| format!("Invalid {}TIMEOUT_SECS value: {}", ENV_PREFIX, value))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            anyhow::bail!(
                "No client id configured. Set client_id in config.toml or {}CLIENT_ID.",
                ENV_PREFIX
            );
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Storage database path, defaulting into the config directory
    pub fn resolved_storage_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("storage.db")),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
