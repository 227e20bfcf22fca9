//! Error types for piterm.

use std::io;

/// Errors produced by the piterm client.
#[derive(Debug, thiserror::Error)]
pub enum PitermError {
    /// A line could not be resolved against the command registry.
    #[error("command not found")]
    CommandNotFound,

    /// A command was registered with an invalid or conflicting signature.
    /// Raised during startup only; the registry is immutable afterwards.
    #[error("registration error: {0}")]
    Registration(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("web API error: {0}")]
    WebApi(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PitermError>;
