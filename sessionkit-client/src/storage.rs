//! Storage abstractions for the session manager
//!
//! The durable key-value store is shared with other execution contexts,
//! so all session-related keys are written through one choke point: the
//! typed `StoreAdapter`. Persistence is best-effort — a failing store
//! degrades to a logged warning, never an error, because the in-memory
//! session remains authoritative for the current tab.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ClientError>;

/// Well-known keys in the durable store
pub mod keys {
    /// Current credential, real or fallback
    pub const TOKEN: &str = "token";

    /// JSON-encoded principal
    pub const CURRENT_USER: &str = "currentUser";

    /// `"true"` while a session is persisted; absent otherwise
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";

    /// `"true"`/`"false"` profile-completion flag
    pub const PROFILE_COMPLETE: &str = "isSignUp2";

    /// Mirror copies for the external sync bridge
    pub const SYNC_TOKEN: &str = "sync:token";
    pub const SYNC_CURRENT_USER: &str = "sync:currentUser";
    pub const SYNC_TIMESTAMP: &str = "sync:timestamp";
}

/// Trait for the durable key-value store
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a value
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store (also the test double)
#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }
}

/// Typed adapter over the durable store
///
/// Every call swallows store failures (quota exceeded, storage disabled)
/// into a warning so callers never have to handle them.
#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn KeyValueStore>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Store read failed");
                None
            }
        }
    }

    pub fn set_string(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "Store write failed");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "Store remove failed");
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_string(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value is not valid JSON");
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_string(key, &raw),
            Err(e) => {
                tracing::warn!(key, error = %e, "Value could not be serialized");
            }
        }
    }
}
