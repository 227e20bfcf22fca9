//! Application configuration.
//!
//! Settings come from three layers, later layers winning: built-in
//! defaults, the TOML config file (written with defaults on first run),
//! and `PITERM_*` environment variables. Changes made at runtime via
//! `config set ...` commands stay in memory; the file is never rewritten
//! after creation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use piterm_types::{PitermError, Result};

pub mod paths;

/// How to authenticate against the PI Web API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Basic,
    Ntlm,
}

impl AuthMethod {
    /// Parse from user input, case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "ntlm" => Ok(Self::Ntlm),
            other => Err(PitermError::Validation(format!(
                "invalid authentication method '{other}' (expected basic or ntlm)"
            ))),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Ntlm => write!(f, "ntlm"),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authentication method for the PI Web API.
    pub auth_method: AuthMethod,
    /// Whether credentials are written to the credential store on login.
    pub store_credentials: bool,
    /// Query fields persisted in the session file between runs.
    pub session_fields: Vec<String>,
    /// Optional path where query results are written as JSON.
    pub output_path: Option<PathBuf>,
    /// Optional PEM bundle added to the trusted TLS roots.
    pub tls_cert_path: Option<PathBuf>,
    /// Enables debug-level log lines.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_method: AuthMethod::Basic,
            store_credentials: false,
            session_fields: vec!["api_base_url".to_string(), "pi_server".to_string()],
            output_path: None,
            tls_cert_path: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, creating the file with defaults if
    /// it does not exist, then apply `PITERM_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let defaults = toml::to_string_pretty(&Self::default())
                .map_err(|e| PitermError::Config(format!("serialize defaults: {e}")))?;
            fs::write(path, defaults)?;
            log::info!("Wrote default config to {}", path.display());
        }

        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_overrides(&|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Separated from [`Config::load`] so tests can drive it without
    /// touching the process environment.
    pub fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("PITERM_AUTH_METHOD") {
            self.auth_method = AuthMethod::parse(&v)?;
        }
        if let Some(v) = lookup("PITERM_STORE_CREDENTIALS") {
            self.store_credentials = parse_bool(&v)?;
        }
        if let Some(v) = lookup("PITERM_SESSION_FIELDS") {
            self.session_fields = v
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        if let Some(v) = lookup("PITERM_OUTPUT_PATH") {
            self.output_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PITERM_TLS_CERT_PATH") {
            self.tls_cert_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PITERM_DEBUG") {
            self.debug = parse_bool(&v)?;
        }
        Ok(())
    }
}

/// Strict boolean parsing for user input and environment values.
///
/// Accepts `true`/`false`/`1`/`0` in any case; everything else is a
/// validation error.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(PitermError::Validation(format!(
            "invalid value '{other}' (expected true or false)"
        ))),
    }
}
