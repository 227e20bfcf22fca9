//! Well-known file locations.
//!
//! Config lives under the platform config directory, mutable state
//! (session, stored credentials) under the platform data directory.

use std::path::PathBuf;

use piterm_types::{PitermError, Result};

const APP_DIR: &str = "piterm";

/// Path of the TOML config file.
pub fn config_file() -> Result<PathBuf> {
    let base = dirs::config_local_dir()
        .ok_or_else(|| PitermError::Config("no config directory on this platform".to_string()))?;
    Ok(base.join(APP_DIR).join("config.toml"))
}

/// Path of the saved-session JSON file.
pub fn session_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("session.json"))
}

/// Path of the stored-credentials file.
pub fn credentials_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("credentials.json"))
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| PitermError::Config("no data directory on this platform".to_string()))?;
    Ok(base.join(APP_DIR))
}
