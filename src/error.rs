//! Error types for offerbot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Membership check error: {0}")]
    Membership(#[from] MembershipError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// User store errors. Non-fatal to the process: handlers answer the
/// user with a degraded response instead.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors from the platform's member-status capability.
///
/// The subscription gate maps every variant to `Indeterminate`,
/// never to `NonMember`.
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Membership lookup failed: {0}")]
    RequestFailed(String),

    #[error("Malformed membership response: {0}")]
    MalformedResponse(String),
}

/// Per-recipient outbound delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to send to {recipient}: {reason}")]
    SendFailed { recipient: i64, reason: String },

    #[error("Failed to answer callback {callback_id}: {reason}")]
    CallbackFailed { callback_id: String, reason: String },
}

/// Platform client / inbound transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Bot API {method} failed: {detail}")]
    Api { method: String, detail: String },

    #[error("Failed to bind server port {port}: {reason}")]
    Bind { port: u16, reason: String },

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
