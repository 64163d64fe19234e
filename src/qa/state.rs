//! Last-good state
//!
//! A small JSON document mapping each module to the most recent image tag
//! that passed every check:
//!
//! ```json
//! { "modules": { "api-v1": { "image_tag": "repo/api:42", "updated_at": "..." } } }
//! ```
//!
//! Access goes through [`LastGoodStore`] as an explicit read-modify-write.
//! The JSON file implementation replaces the whole document with a
//! temp-file-then-rename, so a crash mid-write leaves the previous document
//! intact.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::common::paths::ensure_parent_dir;
use crate::common::{to_json_pretty, utc_now_rfc3339, Error, Result};

/// Most recent passing build of a module
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LastGoodEntry {
    pub image_tag: String,
    pub updated_at: String,
}

impl LastGoodEntry {
    /// Entry for `image_tag`, stamped with the current UTC time
    pub fn now(image_tag: String) -> Self {
        Self {
            image_tag,
            updated_at: utc_now_rfc3339(),
        }
    }
}

/// The whole last-good document
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LastGoodState {
    #[serde(default)]
    pub modules: BTreeMap<String, LastGoodEntry>,
    /// Top-level keys written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Durable storage for last-good entries
pub trait LastGoodStore {
    /// Read the current state; a store that was never written is empty
    fn load(&self) -> Result<LastGoodState>;

    /// Replace or insert the entry for `module`, keeping every other
    /// module's entry, and return the state as written
    fn record(&self, module: &str, entry: LastGoodEntry) -> Result<LastGoodState>;
}

/// Compose the promoted image reference
pub fn image_tag(base_image: &str, tag: &str) -> String {
    format!("{}:{}", base_image, tag)
}

/// Last-good state kept in a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, state: &LastGoodState) -> Result<()> {
        let dir = ensure_parent_dir(&self.path).map_err(|e| Error::persistence(&self.path, e))?;
        let mut payload = to_json_pretty(&self.path, state)?;
        payload.push(b'\n');

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::persistence(&dir, e))?;
        tmp.write_all(&payload)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::persistence(&self.path, e.error))?;

        Ok(())
    }
}

impl LastGoodStore for JsonFileStore {
    fn load(&self) -> Result<LastGoodState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}, starting empty", self.path.display());
                return Ok(LastGoodState::default());
            }
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(LastGoodState::default());
        }

        // An unreadable document is never replaced: doing so would drop the
        // entries of every other module.
        serde_json::from_str(&content).map_err(|e| {
            Error::persistence(&self.path, format!("existing state is not valid JSON: {}", e))
        })
    }

    fn record(&self, module: &str, entry: LastGoodEntry) -> Result<LastGoodState> {
        let mut state = self.load()?;
        tracing::debug!(
            "Recording {} -> {} in {}",
            module,
            entry.image_tag,
            self.path.display()
        );
        state.modules.insert(module.to_string(), entry);
        self.write(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: &str) -> LastGoodEntry {
        LastGoodEntry {
            image_tag: tag.to_string(),
            updated_at: "2024-05-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_image_tag() {
        assert_eq!(image_tag("registry.local/api", "42"), "registry.local/api:42");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path().join("last_good.json"));
        assert_eq!(store.load().unwrap(), LastGoodState::default());
    }

    #[test]
    fn test_empty_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("last_good.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(JsonFileStore::new(&path).load().unwrap().modules.is_empty());
    }

    #[test]
    fn test_record_creates_parent_and_keeps_other_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path().join("state").join("last_good.json"));

        store.record("api-v1", entry("repo/api:1")).unwrap();
        store.record("ui-v1", entry("repo/ui:7")).unwrap();
        let state = store.record("api-v1", entry("repo/api:2")).unwrap();

        assert_eq!(state.modules.len(), 2);
        assert_eq!(state.modules["api-v1"].image_tag, "repo/api:2");
        assert_eq!(state.modules["ui-v1"].image_tag, "repo/ui:7");
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn test_unknown_top_level_keys_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("last_good.json");
        std::fs::write(&path, r#"{"schema": 1, "modules": {}}"#).unwrap();

        let store = JsonFileStore::new(&path);
        store.record("api-v1", entry("repo/api:1")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["schema"], 1);
        assert_eq!(raw["modules"]["api-v1"]["image_tag"], "repo/api:1");
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("last_good.json");
        std::fs::write(&path, "{\"modules\": {\"ui-v1\"").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.record("api-v1", entry("repo/api:1")).unwrap_err();

        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"modules\": {\"ui-v1\""
        );
    }

    #[test]
    fn test_entry_now_is_utc() {
        let entry = LastGoodEntry::now("repo/api:1".to_string());
        assert!(entry.updated_at.ends_with('Z'));
    }
}
