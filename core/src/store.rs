//! Persistent key/value settings: API keys and model names per provider.

use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::ai::ProviderId;

const APP_DIR_NAME: &str = "doc-translator";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("settings store lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat JSON object on disk. Reads go to the file every time so that
/// several processes see each other's writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn open_default() -> Self {
        Self::new(default_settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return BTreeMap::new(),
        };
        serde_json::from_str(&data).unwrap_or_else(|err| {
            warn!(
                "ignoring unreadable settings file {}: {}",
                self.path.display(),
                err
            );
            BTreeMap::new()
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(&values)?;
        write_replacing(&self.path, content.as_bytes()).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Writes next to `target` and renames over it, so other processes never
/// read a half-written file.
fn write_replacing(target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut temp_path = target.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    #[cfg(target_os = "windows")]
    {
        if let Err(err) = fs::rename(&temp_path, target) {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(target)?;
                fs::rename(&temp_path, target)?;
            } else {
                return Err(err);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        fs::rename(&temp_path, target)?;
    }

    Ok(())
}

pub fn default_settings_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(SETTINGS_FILE_NAME)
}

/// Credentials remembered for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl ProviderSettings {
    pub fn api_key_key(provider: ProviderId) -> String {
        format!("{}_api_key", provider.as_str())
    }

    pub fn model_key(provider: ProviderId) -> String {
        format!("{}_model_name", provider.as_str())
    }

    pub fn load(store: &dyn KeyValueStore, provider: ProviderId) -> Self {
        Self {
            api_key: non_blank(store.get(&Self::api_key_key(provider))),
            model: non_blank(store.get(&Self::model_key(provider))),
        }
    }

    /// Writes only the fields that are set; blank values are skipped.
    pub fn save(&self, store: &dyn KeyValueStore, provider: ProviderId) -> Result<(), StoreError> {
        if let Some(api_key) = non_blank(self.api_key.clone()) {
            store.set(&Self::api_key_key(provider), &api_key)?;
        }
        if let Some(model) = non_blank(self.model.clone()) {
            store.set(&Self::model_key(provider), &model)?;
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
