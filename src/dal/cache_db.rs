use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::{report::CompanyRecord, resolution::ResolutionRecord};

pub type UrlCache = JsonFileCache<ResolutionRecord>;
pub type ResultsCache = JsonFileCache<CompanyRecord>;

// Writes stay in memory until `flush`, which replaces the file atomically so
// a crash mid-write cannot corrupt the previous snapshot.
pub struct JsonFileCache<V> {
    path: PathBuf,
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone + Serialize + DeserializeOwned> JsonFileCache<V> {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!(
                        "Cache file {} is unreadable, starting empty: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        JsonFileCache {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        let serialized = {
            let entries = self.entries.lock().expect("cache lock poisoned");
            serde_json::to_string_pretty(&*entries).context("failed to serialize cache")?
        };
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
