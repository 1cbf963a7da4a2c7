use super::traits::{CredentialStore, CREDENTIAL_KEY_NAME};
use crate::error::Result;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// JSON object on disk holding the key under [`CREDENTIAL_KEY_NAME`].
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                log::warn!(
                    "Ignoring malformed credential file at {}",
                    self.path.display()
                );
                Ok(Map::new())
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable credential file at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let map = self.read_map()?;
        Ok(map
            .get(CREDENTIAL_KEY_NAME)
            .and_then(Value::as_str)
            .map(String::from))
    }

    fn save(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(CREDENTIAL_KEY_NAME.to_string(), Value::String(key.to_string()));
        self.write_map(&map)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        if map.remove(CREDENTIAL_KEY_NAME).is_some() {
            if map.is_empty() {
                std::fs::remove_file(&self.path)?;
            } else {
                self.write_map(&map)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("cfg").join("credentials.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save("AIzaSyExample1234").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("AIzaSyExample1234"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"gemini_api_key\""));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"gemini_api_key": "abc"#).unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();

        store.save("AIzaNewKey12345").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("AIzaNewKey12345"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Value>(&raw).is_ok());
    }

    #[test]
    fn test_clear_keeps_unrelated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"gemini_api_key":"k","theme":"dark"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.clear().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme"));
        assert!(!raw.contains("gemini_api_key"));
    }
}
