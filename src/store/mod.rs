//! Profile/settings persistence — a single JSON key-value file.
//!
//! The engine treats the profile as an opaque blob under a fixed key, written
//! by the external UI collaborator and only ever read here. A second fixed
//! key holds the autostart flag. Everything lives in
//! `~/.formpilot/store.json` (override with `FORMPILOT_STORE_PATH`).

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

/// Fixed key for the user-supplied profile blob.
pub const PROFILE_KEY: &str = "profileData";
/// Fixed key for the autostart-on-launch flag.
pub const AUTOFILL_ON_LOAD_KEY: &str = "autofillOnLoad";

pub struct KvStore {
    path: PathBuf,
}

impl KvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Standard location: `FORMPILOT_STORE_PATH` env override, else
    /// `~/.formpilot/store.json`, else a cwd-relative fallback.
    pub fn open_default() -> Self {
        if let Ok(p) = std::env::var("FORMPILOT_STORE_PATH") {
            if !p.trim().is_empty() {
                return Self::new(p.trim());
            }
        }
        let path = dirs::home_dir()
            .map(|h| h.join(".formpilot").join("store.json"))
            .unwrap_or_else(|| PathBuf::from("formpilot-store.json"));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Map<String, Value> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("store file {} is not a JSON object — treating as empty", self.path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(map.clone()))
            .unwrap_or_else(|_| "{}".to_string());
        std::fs::write(&self.path, body)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_all().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut map = self.read_all();
        map.insert(key.to_string(), value);
        if let Err(e) = self.write_all(&map) {
            warn!("store write failed at {}: {}", self.path.display(), e);
        }
    }

    pub fn remove(&self, key: &str) {
        let mut map = self.read_all();
        if map.remove(key).is_some() {
            if let Err(e) = self.write_all(&map) {
                warn!("store write failed at {}: {}", self.path.display(), e);
            }
        }
    }

    /// Parse the stored profile blob. `None` when absent; a blob that fails to
    /// deserialize is also `None` (the UI owns the only real failure path —
    /// JSON that never parsed — so here we just log).
    pub fn load_profile(&self) -> Option<crate::profile::Profile> {
        let raw = self.get(PROFILE_KEY)?;
        match serde_json::from_value(raw) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("stored profile does not deserialize: {}", e);
                None
            }
        }
    }

    pub fn save_profile(&self, profile: Value) {
        self.set(PROFILE_KEY, profile);
    }

    pub fn autofill_on_load(&self) -> bool {
        self.get(AUTOFILL_ON_LOAD_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_autofill_on_load(&self, enabled: bool) {
        self.set(AUTOFILL_ON_LOAD_KEY, Value::Bool(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store(tag: &str) -> KvStore {
        let path = std::env::temp_dir().join(format!(
            "formpilot-store-test-{}-{}.json",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        KvStore::new(path)
    }

    #[test]
    fn set_get_roundtrip_and_missing_key() {
        let store = temp_store("roundtrip");
        assert!(store.get(PROFILE_KEY).is_none());
        store.set(PROFILE_KEY, json!({"firstName": "Ada"}));
        let got = store.get(PROFILE_KEY).unwrap();
        assert_eq!(got["firstName"], "Ada");
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn autofill_flag_defaults_false() {
        let store = temp_store("flag");
        assert!(!store.autofill_on_load());
        store.set_autofill_on_load(true);
        assert!(store.autofill_on_load());
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn malformed_profile_blob_loads_as_none() {
        let store = temp_store("malformed");
        store.set(PROFILE_KEY, json!("not an object"));
        assert!(store.load_profile().is_none());
        let _ = std::fs::remove_file(store.path());
    }
}
