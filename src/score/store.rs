use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt preferences: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefValue {
    Int(i32),
    Float(f32),
    Text(String),
}

/// Flat key-value preferences. Writes stay in memory until [`PrefsStore::flush`].
#[derive(Clone, Debug, Default)]
pub struct PrefsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, PrefValue>,
}

impl PrefsStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a file-backed store. A missing file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.values.get(key) {
            Some(PrefValue::Int(value)) => *value,
            _ => default,
        }
    }

    pub fn set_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), PrefValue::Int(value));
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        match self.values.get(key) {
            Some(PrefValue::Float(value)) => *value,
            _ => default,
        }
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), PrefValue::Float(value));
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(PrefValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .insert(key.to_string(), PrefValue::Text(value.into()));
    }

    pub fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_fall_back_on_mismatch() {
        let mut store = PrefsStore::in_memory();
        store.set_int("lives", 3);
        store.set_string("pilot", "Ann");
        assert_eq!(store.get_int("lives", 0), 3);
        assert_eq!(store.get_float("lives", 1.5), 1.5);
        assert_eq!(store.get_string("pilot"), Some("Ann"));
        assert_eq!(store.get_string("missing"), None);
        store.delete_key("lives");
        assert!(!store.has_key("lives"));
    }

    #[test]
    fn flush_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!(
            "spider-siege-prefs-{}-roundtrip.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        let mut store = PrefsStore::open(&path).unwrap();
        store.set_float("volume", 0.25);
        store.set_int("last_score", 420);
        store.flush().unwrap();

        let reopened = PrefsStore::open(&path).unwrap();
        assert_eq!(reopened.get_float("volume", 1.0), 0.25);
        assert_eq!(reopened.get_int("last_score", 0), 420);
        let _ = fs::remove_file(&path);
    }
}
