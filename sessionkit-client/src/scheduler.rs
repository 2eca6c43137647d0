//! Background refresh scheduler
//!
//! A recurring timer that asks the session manager to self-heal a
//! near-expiry credential. Owned by the same scope that owns the
//! manager, with an explicit `start`/`stop` lifecycle so tests and
//! component remounts never leak timers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use sessionkit_core::expiry;

use crate::session::SessionManager;

pub struct RefreshScheduler {
    manager: Arc<SessionManager>,
    interval: Duration,
    buffer_secs: i64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(manager: Arc<SessionManager>, interval: Duration, buffer_secs: i64) -> Self {
        Self {
            manager,
            interval,
            buffer_secs,
            handle: Mutex::new(None),
        }
    }

    /// Start the timer; a no-op if it is already running
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let manager = Arc::clone(&self.manager);
        let interval = self.interval;
        let buffer_secs = self.buffer_secs;

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a freshly
            // restored session is not checked before initialize settles
            ticker.tick().await;
            loop {
                ticker.tick().await;
                check_and_refresh(&manager, buffer_secs).await;
            }
        }));
        tracing::debug!(interval_secs = interval.as_secs(), "Refresh scheduler started");
    }

    /// Stop the timer; a no-op if it is not running
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
            tracing::debug!("Refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One scheduler tick: refresh if the credential is inside the window
///
/// Returns whether a refresh was attempted. Refresh failures are already
/// resolved by the manager (forced logout); the scheduler only logs them.
pub async fn check_and_refresh(manager: &Arc<SessionManager>, buffer_secs: i64) -> bool {
    let snapshot = manager.snapshot();
    let Some(credential) = snapshot.credential else {
        return false;
    };

    if !expiry::needs_refresh(credential.claims(), Utc::now().timestamp(), buffer_secs) {
        return false;
    }

    tracing::debug!("Credential near expiry; refreshing");
    if let Err(e) = Arc::clone(manager).refresh().await {
        tracing::warn!(error = %e, "Scheduled refresh failed");
    }
    true
}
