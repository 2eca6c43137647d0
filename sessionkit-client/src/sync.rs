//! External sync bridge
//!
//! A cooperating agent (a browser extension in the original deployment)
//! needs to observe this tab's session changes, but no single delivery
//! mechanism is guaranteed to be observed. The bridge fans each event out
//! to a list of independent notifier strategies; a failing channel is
//! logged and skipped so the remaining channels still fire. The bridge
//! itself never errors.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use sessionkit_core::Principal;

use crate::error::ClientError;
use crate::storage::{keys, StoreAdapter};

/// A session change broadcast to the cooperating agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    SessionUpdated {
        credential: String,
        principal: Principal,
        timestamp: i64,
    },
    LoggedOut {
        timestamp: i64,
    },
}

impl SyncEvent {
    pub fn session_updated(credential: &str, principal: &Principal) -> Self {
        Self::SessionUpdated {
            credential: credential.to_string(),
            principal: principal.clone(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn logged_out() -> Self {
        Self::LoggedOut {
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// A single delivery channel to the cooperating agent
pub trait SyncNotifier: Send + Sync {
    /// Channel name, for diagnostics
    fn name(&self) -> &str;

    /// Deliver one event; failure must not affect other channels
    fn notify(&self, event: &SyncEvent) -> Result<(), ClientError>;
}

/// Fan-out over all configured delivery channels
#[derive(Default)]
pub struct SyncBridge {
    notifiers: Vec<Box<dyn SyncNotifier>>,
}

impl SyncBridge {
    pub fn new(notifiers: Vec<Box<dyn SyncNotifier>>) -> Self {
        Self { notifiers }
    }

    /// Bridge with the channels that need no host wiring: the storage
    /// mirror and the polled shared cell. Returns the cell handle so the
    /// agent side can read it. Broadcast and callback channels depend on
    /// the embedding, so callers `push` those separately.
    pub fn standard(adapter: StoreAdapter) -> (Self, Arc<RwLock<Option<SyncEvent>>>) {
        let shared = SharedCellNotifier::new();
        let cell = shared.cell();
        let bridge = Self::new(vec![
            Box::new(StorageMirrorNotifier::new(adapter)),
            Box::new(shared),
        ]);
        (bridge, cell)
    }

    pub fn push(&mut self, notifier: Box<dyn SyncNotifier>) {
        self.notifiers.push(notifier);
    }

    /// Deliver an event on every channel, isolating failures
    pub fn broadcast(&self, event: &SyncEvent) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(event) {
                tracing::warn!(channel = notifier.name(), error = %e, "Sync channel failed");
            }
        }
    }
}

/// Mirrors the session into distinguished store keys
///
/// Other execution contexts observe these writes via storage-change
/// events. Goes through the `StoreAdapter` so session keys keep a single
/// write path.
pub struct StorageMirrorNotifier {
    adapter: StoreAdapter,
}

impl StorageMirrorNotifier {
    pub fn new(adapter: StoreAdapter) -> Self {
        Self { adapter }
    }
}

impl SyncNotifier for StorageMirrorNotifier {
    fn name(&self) -> &str {
        "storage-mirror"
    }

    fn notify(&self, event: &SyncEvent) -> Result<(), ClientError> {
        match event {
            SyncEvent::SessionUpdated {
                credential,
                principal,
                timestamp,
            } => {
                self.adapter.set_string(keys::SYNC_TOKEN, credential);
                self.adapter.set_json(keys::SYNC_CURRENT_USER, principal);
                self.adapter
                    .set_string(keys::SYNC_TIMESTAMP, &timestamp.to_string());
            }
            SyncEvent::LoggedOut { timestamp } => {
                self.adapter.remove(keys::SYNC_TOKEN);
                self.adapter.remove(keys::SYNC_CURRENT_USER);
                self.adapter
                    .set_string(keys::SYNC_TIMESTAMP, &timestamp.to_string());
            }
        }
        Ok(())
    }
}

/// In-process event channel (the custom-event analog)
pub struct BroadcastNotifier {
    tx: tokio::sync::broadcast::Sender<SyncEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

impl SyncNotifier for BroadcastNotifier {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn notify(&self, event: &SyncEvent) -> Result<(), ClientError> {
        // No receivers is not a delivery failure
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// User-supplied delivery hook (the window-message analog)
pub struct CallbackNotifier {
    callback: Box<dyn Fn(&SyncEvent) + Send + Sync>,
}

impl CallbackNotifier {
    pub fn new(callback: impl Fn(&SyncEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl SyncNotifier for CallbackNotifier {
    fn name(&self) -> &str {
        "callback"
    }

    fn notify(&self, event: &SyncEvent) -> Result<(), ClientError> {
        (self.callback)(event);
        Ok(())
    }
}

/// Last-resort synchronous fallback: the latest event in a shared slot
/// that the agent can poll (the well-known-global analog)
#[derive(Default)]
pub struct SharedCellNotifier {
    cell: Arc<RwLock<Option<SyncEvent>>>,
}

impl SharedCellNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the agent reads the latest event from
    pub fn cell(&self) -> Arc<RwLock<Option<SyncEvent>>> {
        Arc::clone(&self.cell)
    }
}

impl SyncNotifier for SharedCellNotifier {
    fn name(&self) -> &str {
        "shared-cell"
    }

    fn notify(&self, event: &SyncEvent) -> Result<(), ClientError> {
        *self.cell.write().unwrap() = Some(event.clone());
        Ok(())
    }
}
