use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::{AppOverrides, Taxonomy, DEFAULT_CATEGORIES};

pub const DEFAULT_TRACKING_INTERVAL_SECS: u64 = 30;
pub const MIN_TRACKING_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    auto_start: bool,
    tracking_interval: i64,
    ai_enabled: bool,
    api_key: String,
    categories: Vec<String>,
    category_descriptions: HashMap<String, String>,
    category_weights: HashMap<String, f64>,
    app_overrides: AppOverrides,
    custom_categorization_prompt: String,
    ignored_processes: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            auto_start: true,
            tracking_interval: DEFAULT_TRACKING_INTERVAL_SECS as i64,
            ai_enabled: true,
            api_key: String::new(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            category_descriptions: HashMap::new(),
            category_weights: HashMap::new(),
            app_overrides: AppOverrides::new(),
            custom_categorization_prompt: String::new(),
            ignored_processes: vec![
                "loginwindow".into(),
                "LockApp".into(),
                "ScreenSaverEngine".into(),
            ],
        }
    }
}

/// Everything the categorization engine needs, read in one go.
#[derive(Debug, Clone)]
pub struct CategorizationSettings {
    /// `aiEnabled` and a non-empty API key.
    pub ai_enabled: bool,
    pub taxonomy: Taxonomy,
    pub overrides: AppOverrides,
    pub custom_prompt: Option<String>,
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(UserSettings::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw JSON value for a camelCase key, `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        let guard = self.read();
        serde_json::to_value(&*guard)
            .ok()
            .and_then(|value| value.get(key).cloned())
    }

    /// Typed read of `key`, falling back to `default` when missing or mistyped.
    pub fn get_or<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    /// Write one key. The value must deserialize into the key's type.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self.write();
        let mut document = serde_json::to_value(&*guard)?;
        let object = document
            .as_object_mut()
            .ok_or_else(|| anyhow!("settings did not serialize to an object"))?;
        if !object.contains_key(key) {
            return Err(anyhow!("unknown settings key '{key}'"));
        }
        object.insert(key.to_string(), value);

        let mut updated: UserSettings = serde_json::from_value(document)
            .with_context(|| format!("invalid value for settings key '{key}'"))?;
        if updated.categories.iter().all(|c| c.trim().is_empty()) {
            updated.categories = UserSettings::default().categories;
        }

        // Disk first; a failed write leaves the in-memory settings untouched.
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }

    pub fn auto_start(&self) -> bool {
        self.read().auto_start
    }

    /// Configured poll interval; anything under the minimum falls back to the default.
    pub fn tracking_interval_secs(&self) -> u64 {
        normalize_interval(self.read().tracking_interval)
    }

    pub fn api_key(&self) -> String {
        self.read().api_key.clone()
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.set("apiKey", Value::String(api_key.trim().to_string()))
    }

    pub fn ai_enabled(&self) -> bool {
        let guard = self.read();
        guard.ai_enabled && !guard.api_key.trim().is_empty()
    }

    pub fn taxonomy(&self) -> Taxonomy {
        let guard = self.read();
        Taxonomy::new(&guard.categories)
            .with_descriptions(&guard.category_descriptions)
            .with_weights(&guard.category_weights)
    }

    pub fn app_overrides(&self) -> AppOverrides {
        self.read().app_overrides.clone()
    }

    pub fn custom_prompt(&self) -> Option<String> {
        let prompt = self.read().custom_categorization_prompt.clone();
        if prompt.trim().is_empty() {
            None
        } else {
            Some(prompt)
        }
    }

    pub fn ignored_processes(&self) -> Vec<String> {
        self.read().ignored_processes.clone()
    }

    pub fn categorization(&self) -> CategorizationSettings {
        CategorizationSettings {
            ai_enabled: self.ai_enabled(),
            taxonomy: self.taxonomy(),
            overrides: self.app_overrides(),
            custom_prompt: self.custom_prompt(),
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

/// Poll interval in seconds; values under the minimum fall back to the default.
pub fn normalize_interval(raw: i64) -> u64 {
    if raw < MIN_TRACKING_INTERVAL_SECS as i64 {
        DEFAULT_TRACKING_INTERVAL_SECS
    } else {
        raw as u64
    }
}
