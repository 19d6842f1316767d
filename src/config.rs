//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Chat id of the channel users must be subscribed to.
    pub channel_id: String,
    /// Human-readable channel name, shown in subscribe prompts.
    pub channel_name: String,
    /// The single operator id allowed to run admin commands.
    pub admin_id: i64,
    /// Public base URL for webhook delivery. When absent the bot
    /// falls back to long polling.
    pub webhook_url: Option<String>,
    /// Path the webhook route is mounted on.
    pub webhook_path: String,
    /// Port for the webhook server.
    pub port: u16,
    /// Path of the local user database.
    pub db_path: PathBuf,
    /// Path of the log file (logs also go to the console).
    pub log_file: PathBuf,
    /// Maximum in-flight deliveries during a broadcast.
    pub broadcast_concurrency: usize,
}

impl BotConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = require_env("BOT_TOKEN")?;
        let channel_id = require_env("CHANNEL_ID")?;
        let channel_name =
            std::env::var("CHANNEL_NAME").unwrap_or_else(|_| "our channel".to_string());
        let admin_id = parse_value("ADMIN_ID", &require_env("ADMIN_ID")?)?;
        let webhook_url = std::env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());
        let webhook_path =
            std::env::var("WEBHOOK_PATH").unwrap_or_else(|_| "/webhook".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => parse_value("PORT", &raw)?,
            Err(_) => 5000,
        };
        let db_path = std::env::var("OFFERBOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/offerbot.db"));
        let log_file = std::env::var("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("offerbot.log"));
        let broadcast_concurrency = match std::env::var("OFFERBOT_BROADCAST_CONCURRENCY") {
            Ok(raw) => parse_value("OFFERBOT_BROADCAST_CONCURRENCY", &raw)?,
            Err(_) => 8,
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            channel_id,
            channel_name,
            admin_id,
            webhook_url,
            webhook_path,
            port,
            db_path,
            log_file,
            broadcast_concurrency,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
