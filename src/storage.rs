//! Progress persistence.
//!
//! Everything the game remembers lives under three string keys. The
//! [`KeyValueStore`] seam lets native code and tests run against
//! [`MemoryStore`] while the browser build uses `window.localStorage`.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::StorageError;
use crate::i18n::Locale;
use crate::stats::PlayerStats;

pub const LANGUAGE_KEY: &str = "mathDungeon.language";
pub const LEARNING_LANGUAGE_KEY: &str = "mathDungeon.learningLanguage";
pub const STATS_KEY: &str = "mathDungeon.progress.v2";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// `window.localStorage`.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// `None` when storage is disabled or the page has no window.
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok().flatten()?;
        Some(Self { storage })
    }
}

fn js_error(err: wasm_bindgen::JsValue) -> StorageError {
    StorageError::Backend(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(js_error)
    }
}

/// Typed access to the saved language choices and player stats. Failures are
/// logged and swallowed: a broken store never stops the game.
pub struct ProgressStore<S> {
    store: S,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, %err, "storage read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            tracing::warn!(key, %err, "storage write failed");
        }
    }

    fn read_locale(&self, key: &str, default: Locale) -> Locale {
        self.read(key).and_then(|code| Locale::parse(&code)).unwrap_or(default)
    }

    /// UI language; Japanese when nothing valid is stored.
    pub fn language(&self) -> Locale {
        self.read_locale(LANGUAGE_KEY, Locale::Ja)
    }

    pub fn set_language(&self, locale: Locale) {
        self.write(LANGUAGE_KEY, locale.code());
    }

    /// Support language for kokugo questions; English by default.
    pub fn learning_language(&self) -> Locale {
        self.read_locale(LEARNING_LANGUAGE_KEY, Locale::En)
    }

    pub fn set_learning_language(&self, locale: Locale) {
        self.write(LEARNING_LANGUAGE_KEY, locale.code());
    }

    /// Saved stats repaired against defaults, or fresh stats.
    pub fn load_stats(&self) -> PlayerStats {
        let Some(raw) = self.read(STATS_KEY) else {
            return PlayerStats::default();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => PlayerStats::normalize(&value),
            Err(err) => {
                tracing::warn!(%err, "stored stats are not valid JSON; starting fresh");
                PlayerStats::default()
            }
        }
    }

    pub fn save_stats(&self, stats: &PlayerStats) {
        match serde_json::to_string(stats) {
            Ok(json) => self.write(STATS_KEY, &json),
            Err(err) => tracing::warn!(%err, "could not encode stats"),
        }
    }

    pub fn clear_stats(&self) {
        if let Err(err) = self.store.remove(STATS_KEY) {
            tracing::warn!(%err, "storage remove failed");
        }
    }
}
