//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Process configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token used for the Bot API session.
    pub bot_token: SecretString,
    /// Path to the local message database.
    pub db_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `TELEGRAM_BOT_TOKEN` is required; `SENTINEL_DB_PATH` defaults to
    /// `data/sentinel.db`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;

        let db_path = std::env::var("SENTINEL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/sentinel.db"));

        Ok(Self { bot_token, db_path })
    }
}
