// src/state/sync.rs
// Read-on-start / write-on-change synchronization of the four persisted keys

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::envelope::{decode, encode};
use super::store::{KeyValueStore, StoreError};
use super::{EXAMPLES_KEY, HISTORY_KEY, THEME_KEY, USER_KEY};
use crate::types::{HistoryItem, Theme, TrainingExample, User};

/// Everything restored from storage at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub history: Vec<HistoryItem>,
    pub examples: Vec<TrainingExample>,
    pub user: Option<User>,
    pub theme: Theme,
}

pub struct StateSync {
    store: Box<dyn KeyValueStore>,
}

impl StateSync {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Load all keys. Each key is independent: unreadable or malformed values
    /// are logged and replaced by their defaults.
    pub fn load(&self) -> PersistedState {
        PersistedState {
            history: self.read_or_default(HISTORY_KEY, "history"),
            examples: self.read_or_default(EXAMPLES_KEY, "examples"),
            user: self.read_or_default::<Option<User>>(USER_KEY, "user"),
            theme: self.read_or_default(THEME_KEY, "theme"),
        }
    }

    pub fn load_history(&self) -> Vec<HistoryItem> {
        self.read_or_default(HISTORY_KEY, "history")
    }

    pub fn load_examples(&self) -> Vec<TrainingExample> {
        self.read_or_default(EXAMPLES_KEY, "examples")
    }

    pub fn load_user(&self) -> Option<User> {
        self.read_or_default(USER_KEY, "user")
    }

    pub fn load_theme(&self) -> Theme {
        self.read_or_default(THEME_KEY, "theme")
    }

    /// Rewrite the whole history list
    pub fn save_history(&self, history: &[HistoryItem]) -> Result<(), StoreError> {
        self.write(HISTORY_KEY, &history)
    }

    /// Rewrite the whole examples list
    pub fn save_examples(&self, examples: &[TrainingExample]) -> Result<(), StoreError> {
        self.write(EXAMPLES_KEY, &examples)
    }

    /// Persist the user, or delete the key when signed out
    pub fn save_user(&self, user: Option<&User>) -> Result<(), StoreError> {
        match user {
            Some(user) => self.write(USER_KEY, user),
            None => {
                debug!("Removing persisted user");
                self.store.remove(USER_KEY)
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.write(THEME_KEY, &theme)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let payload = encode(&value)?;
        self.store.set(key, &payload)?;
        debug!(key, bytes = payload.len(), "Persisted state");
        Ok(())
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str, label: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", label, e);
                return T::default();
            }
        };

        match decode::<T>(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse {}: {}", label, e);
                T::default()
            }
        }
    }
}
