//! The two-slot query session and its persistence.
//!
//! The session file is a JSON object keyed `"1"` and `"2"`, each slot
//! holding only the fields named by the configured persisted-field list.
//! Loading applies saved fields over defaults; a slot that fails to
//! deserialize is logged and replaced with defaults rather than aborting
//! startup.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use piterm_types::{PitermError, Result};

use crate::query::Query;

const SLOT_KEYS: [&str; 2] = ["1", "2"];

/// Two query definitions with one active at a time.
#[derive(Debug, Clone)]
pub struct Session {
    slots: [Query; 2],
    active: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            slots: [Query::default(), Query::default()],
            active: 0,
        }
    }
}

impl Session {
    /// The active query.
    pub fn active(&self) -> &Query {
        &self.slots[self.active]
    }

    /// Mutable access to the active query.
    pub fn active_mut(&mut self) -> &mut Query {
        &mut self.slots[self.active]
    }

    /// 1-based number of the active slot, for display.
    pub fn active_slot(&self) -> usize {
        self.active + 1
    }

    /// Toggle which query is active.
    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }

    /// Load a session from `path`, creating an empty session file if none
    /// exists. Only `fields` are read from each slot.
    pub fn load(path: &Path, fields: &[String]) -> Result<Self> {
        if !path.is_file() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, r#"{"1": {}, "2": {}}"#)?;
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&contents)?;
        let root = root
            .as_object()
            .ok_or_else(|| PitermError::Session("session file is not a JSON object".to_string()))?;

        let mut session = Self::default();
        for (i, key) in SLOT_KEYS.iter().enumerate() {
            let Some(saved) = root.get(*key).and_then(Value::as_object) else {
                continue;
            };
            match apply_saved_fields(saved, fields) {
                Ok(query) => session.slots[i] = query,
                Err(e) => {
                    log::warn!("Ignoring saved query {key}: {e}");
                },
            }
        }
        Ok(session)
    }

    /// Save both slots to `path`, keeping only `fields` from each.
    pub fn save(&self, path: &Path, fields: &[String]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut root = Map::new();
        for (i, key) in SLOT_KEYS.iter().enumerate() {
            root.insert((*key).to_string(), filter_fields(&self.slots[i], fields)?);
        }
        let contents = serde_json::to_string_pretty(&Value::Object(root))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Serialize a query and keep only the named fields.
fn filter_fields(query: &Query, fields: &[String]) -> Result<Value> {
    let Value::Object(full) = serde_json::to_value(query)? else {
        return Err(PitermError::Session("query did not serialize to an object".to_string()));
    };
    let kept: Map<String, Value> = full
        .into_iter()
        .filter(|(name, _)| fields.iter().any(|f| f == name))
        .collect();
    Ok(Value::Object(kept))
}

/// Overlay saved fields onto a default query.
fn apply_saved_fields(saved: &Map<String, Value>, fields: &[String]) -> Result<Query> {
    let Value::Object(mut base) = serde_json::to_value(Query::default())? else {
        return Err(PitermError::Session("query did not serialize to an object".to_string()));
    };
    for (name, value) in saved {
        if fields.iter().any(|f| f == name) && base.contains_key(name) {
            base.insert(name.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(Value::Object(base))?)
}
