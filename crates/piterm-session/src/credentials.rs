//! The credential pair and its optional on-disk store.
//!
//! Credentials live in memory for the lifetime of the process. When the
//! configuration enables storage, they are written to a file readable
//! only by the owning user and loaded again on the next start.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use piterm_types::Result;

/// Username/password pair for the PI Web API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Whether a login has been performed (or restored from the store).
    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// Replace the stored pair.
    pub fn set(&mut self, username: String, password: String) {
        self.username = Some(username);
        self.password = Some(password);
    }

    /// Forget the pair.
    pub fn clear(&mut self) {
        self.username = None;
        self.password = None;
    }

    /// Load stored credentials; absent file means logged out.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the pair to `path`, restricting permissions to the owner.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Remove the stored file, if any.
    pub fn delete_store(path: &Path) -> Result<()> {
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
