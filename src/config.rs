use std::env::var;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    application::handlers::message_dispatcher::{DispatcherConfig, FailedSendPolicy},
    infrastructure::messaging::telegram::DEFAULT_API_URL,
};

pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("failed to parse {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("failed to parse options file {path}: {source}")]
    OptionsFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration plus the options file error, if the file was present but ignored.
/// Reported by the caller once logging is up.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub ignored_options: Option<ConfigError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "TELEGRAM_TOKEN")]
    pub telegram_token: String,
    #[serde(rename = "TELEGRAM_ADMIN_IDS")]
    pub telegram_admin_ids: String,
    #[serde(rename = "TELEGRAM_TARGET_CHAT")]
    pub telegram_target_chat: String,
    #[serde(rename = "TELEGRAM_API_URL")]
    pub telegram_api_url: String,
    #[serde(rename = "DEBUG")]
    pub debug: bool,
    #[serde(rename = "SEND_COOLDOWN_MS")]
    pub send_cooldown_ms: u64,
    #[serde(rename = "SEND_INTERVAL_MS")]
    pub send_interval_ms: u64,
    #[serde(rename = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,
    #[serde(rename = "CHARGE_FAILED_SENDS")]
    pub charge_failed_sends: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            telegram_admin_ids: String::new(),
            telegram_target_chat: String::new(),
            telegram_api_url: DEFAULT_API_URL.to_string(),
            debug: false,
            send_cooldown_ms: 333,
            send_interval_ms: 1000,
            queue_capacity: 100,
            charge_failed_sends: true,
        }
    }
}

impl Config {
    /// Reads the options file when one is present and parses, the environment otherwise.
    pub fn try_parse() -> Result<LoadedConfig, ConfigError> {
        let _ = dotenv();

        let options_path = var("OPTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OPTIONS_PATH));

        let (config, ignored_options) = match Self::from_file(&options_path) {
            Ok(Some(config)) => (config, None),
            Ok(None) => (Self::from_env()?, None),
            Err(err) => (Self::from_env()?, Some(err)),
        };
        config.validate()?;
        Ok(LoadedConfig {
            config,
            ignored_options,
        })
    }

    /// `Ok(None)` when there is no readable file at `path`.
    fn from_file(path: &Path) -> Result<Option<Config>, ConfigError> {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::OptionsFile {
                path: path.display().to_string(),
                source,
            })
    }

    fn from_env() -> Result<Config, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            telegram_token: var("TELEGRAM_TOKEN")
                .map_err(|_| ConfigError::Missing("TELEGRAM_TOKEN"))?,
            telegram_admin_ids: var("TELEGRAM_ADMIN_IDS").unwrap_or_default(),
            telegram_target_chat: var("TELEGRAM_TARGET_CHAT").unwrap_or_default(),
            telegram_api_url: var("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
            debug: env_or("DEBUG", defaults.debug)?,
            send_cooldown_ms: env_or("SEND_COOLDOWN_MS", defaults.send_cooldown_ms)?,
            send_interval_ms: env_or("SEND_INTERVAL_MS", defaults.send_interval_ms)?,
            queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity)?,
            charge_failed_sends: env_or("CHARGE_FAILED_SENDS", defaults.charge_failed_sends)?,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_TOKEN"));
        }
        if self.send_interval_ms == 0 {
            return Err(ConfigError::Zero("SEND_INTERVAL_MS"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("QUEUE_CAPACITY"));
        }
        Ok(())
    }

    /// Comma separated ids; entries that do not parse are skipped.
    pub fn admin_ids(&self) -> Vec<i64> {
        self.telegram_admin_ids
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }

    pub fn target_chat(&self) -> Option<i64> {
        self.telegram_target_chat.trim().parse().ok()
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            cooldown: Duration::from_millis(self.send_cooldown_ms),
            tick_interval: Duration::from_millis(self.send_interval_ms),
            queue_capacity: self.queue_capacity,
            failed_send_policy: if self.charge_failed_sends {
                FailedSendPolicy::ConsumeCooldown
            } else {
                FailedSendPolicy::ReleaseCooldown
            },
        }
    }
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
