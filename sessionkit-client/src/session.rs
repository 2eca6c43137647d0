//! Session manager: the client-side session state machine
//!
//! Owns the in-memory `{credential, principal, status}` aggregate and
//! reconciles it with the durable store and the remote auth service.
//! One instance is constructed at application start and handed to
//! consumers by `Arc`; UI code observes it through a watch channel
//! instead of a shared mutable global.
//!
//! Invariants:
//! - `Authenticated` implies a non-null credential and principal, with
//!   the credential not yet expired at the time of the transition
//! - `Unauthenticated` implies both are null
//! - Persisted session keys are only ever written through the
//!   `StoreAdapter` owned here (and the bridge's storage mirror)
//!
//! Operations suspend only at remote exchanges; in-memory fields are not
//! mutated until the exchange resolves, so readers during the await see
//! the pre-operation state.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::watch;

use sessionkit_core::{expiry, Credential, Principal, PrincipalUpdate};

use crate::auth::{AuthService, LoginRequest};
use crate::config::SessionConfig;
use crate::error::AuthFailure;
use crate::storage::{keys, StoreAdapter};
use crate::sync::{SyncBridge, SyncEvent};

/// Session lifecycle states
///
/// `Expired` is transient: it is always resolved to `Unauthenticated`
/// once cleanup completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

/// Point-in-time view of the session, published to subscribers
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub credential: Option<Credential>,
    pub principal: Option<Principal>,
    pub status: SessionStatus,
    /// True until `initialize` settles; route guards gate rendering on it
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

struct SessionState {
    credential: Option<Credential>,
    principal: Option<Principal>,
    status: SessionStatus,
    is_loading: bool,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            credential: self.credential.clone(),
            principal: self.principal.clone(),
            status: self.status,
            is_loading: self.is_loading,
        }
    }
}

type InflightRefresh = Shared<BoxFuture<'static, Result<(), AuthFailure>>>;

/// The session manager
pub struct SessionManager {
    state: RwLock<SessionState>,
    watch_tx: watch::Sender<SessionSnapshot>,
    /// Memo of the in-flight refresh; overlapping callers await the same
    /// future instead of starting duplicate remote exchanges
    inflight_refresh: Mutex<Option<InflightRefresh>>,
    adapter: StoreAdapter,
    auth: Arc<dyn AuthService>,
    bridge: SyncBridge,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        adapter: StoreAdapter,
        auth: Arc<dyn AuthService>,
        bridge: SyncBridge,
        config: SessionConfig,
    ) -> Self {
        let state = SessionState {
            credential: None,
            principal: None,
            status: SessionStatus::Unauthenticated,
            is_loading: true,
        };
        let (watch_tx, _) = watch::channel(state.snapshot());

        Self {
            state: RwLock::new(state),
            watch_tx,
            inflight_refresh: Mutex::new(None),
            adapter,
            auth,
            bridge,
            config,
        }
    }

    /// Current session view
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().unwrap().snapshot()
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.watch_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().unwrap().is_loading
    }

    /// Profile-completion flag, persisted separately from the session
    /// proper; the UI uses it for route guarding
    pub fn is_profile_complete(&self) -> bool {
        self.adapter.get_string(keys::PROFILE_COMPLETE).as_deref() == Some("true")
    }

    /// Restore the session from the durable store, or clear it
    ///
    /// Idempotent: running it twice against unchanged storage yields the
    /// same state. Failure paths never surface an error; a corrupt or
    /// expired record silently degrades to "no session" after purging it.
    pub fn initialize(&self) {
        let authenticated_flag = self.adapter.get_string(keys::IS_AUTHENTICATED);
        if authenticated_flag.as_deref() != Some("true") {
            self.finish_loading(SessionStatus::Unauthenticated, None, None);
            return;
        }

        let raw = self.adapter.get_string(keys::TOKEN);
        let principal: Option<Principal> = self.adapter.get_json(keys::CURRENT_USER);

        let (raw, principal) = match (raw, principal) {
            (Some(raw), Some(principal)) => (raw, principal),
            _ => {
                self.purge_persisted();
                self.finish_loading(SessionStatus::Unauthenticated, None, None);
                return;
            }
        };

        let credential = match Credential::decode(&raw) {
            Ok(credential) => credential,
            Err(e) => {
                tracing::debug!(error = %e, "Persisted credential did not decode; clearing");
                self.purge_persisted();
                self.finish_loading(SessionStatus::Unauthenticated, None, None);
                return;
            }
        };

        // No `Expired` detour here: the record is purged before anything
        // is published, so subscribers only ever see the settled state.
        if let Err(e) = expiry::ensure_valid(credential.claims(), Utc::now().timestamp()) {
            tracing::debug!(error = %e, "Persisted credential rejected; clearing");
            self.purge_persisted();
            self.finish_loading(SessionStatus::Unauthenticated, None, None);
            return;
        }

        self.finish_loading(SessionStatus::Authenticated, Some(credential), Some(principal));
    }

    /// Direct (email/password) login
    pub async fn login(&self, request: LoginRequest) -> Result<(), AuthFailure> {
        let prior_status = self.begin_authenticating();

        match self.auth.login(&request).await {
            Ok(resp) => {
                self.establish(resp.credential, resp.principal, None);
                Ok(())
            }
            Err(e) => {
                self.fail_authenticating(prior_status);
                Err(AuthFailure::new(e.0))
            }
        }
    }

    /// Federated login via an identity-provider assertion
    ///
    /// The exchange has been observed to return a principal without a
    /// credential. The session still becomes `Authenticated`: a fallback
    /// credential is synthesized so downstream code never sees a null
    /// credential on an authenticated session. Availability over
    /// strictness; do not "fix" this by failing the login.
    pub async fn federated_login(&self, assertion: &str) -> Result<(), AuthFailure> {
        let prior_status = self.begin_authenticating();

        match self.auth.federated_login(assertion).await {
            Ok(resp) => {
                let profile_complete = !resp.needs_profile_completion;
                self.establish(resp.credential, resp.principal, Some(profile_complete));
                Ok(())
            }
            Err(e) => {
                self.fail_authenticating(prior_status);
                Err(AuthFailure::new(e.0))
            }
        }
    }

    /// Log out: clear locally, then best-effort remote revoke
    ///
    /// Local cleanup happens first and unconditionally, so a logout
    /// issued while a refresh is in flight wins immediately. The revoke
    /// failure is logged and ignored.
    pub async fn logout(&self) {
        let credential = {
            let mut state = self.state.write().unwrap();
            let credential = state.credential.take();
            state.principal = None;
            state.status = SessionStatus::Unauthenticated;
            credential
        };
        self.publish();
        self.purge_persisted();
        self.bridge.broadcast(&SyncEvent::logged_out());

        if let Some(credential) = credential {
            if let Err(e) = self.auth.revoke(credential.raw()).await {
                tracing::warn!(error = %e, "Credential revoke failed; session cleared locally");
            }
        }
    }

    /// Exchange the current credential for a fresh one
    ///
    /// Deduplicated: a second caller while one refresh is outstanding
    /// awaits the same pending outcome. The memo is cleared once the
    /// exchange settles, success or failure. An unrefreshable session is
    /// treated as invalid: exchange failure forces a logout.
    pub async fn refresh(self: Arc<Self>) -> Result<(), AuthFailure> {
        let fut = {
            let mut inflight = self.inflight_refresh.lock().unwrap();
            if let Some(fut) = inflight.as_ref() {
                fut.clone()
            } else {
                let this = Arc::clone(&self);
                let fut: InflightRefresh = async move {
                    let result = this.do_refresh().await;
                    this.inflight_refresh.lock().unwrap().take();
                    result
                }
                .boxed()
                .shared();
                *inflight = Some(fut.clone());
                fut
            }
        };

        fut.await
    }

    async fn do_refresh(&self) -> Result<(), AuthFailure> {
        let started_from = {
            let state = self.state.read().unwrap();
            match (&state.status, &state.credential) {
                (SessionStatus::Authenticated, Some(credential)) => {
                    credential.raw().to_string()
                }
                _ => return Err(AuthFailure::new("No active session to refresh")),
            }
        };

        match self.auth.refresh(&started_from).await {
            Ok(resp) => {
                let principal = {
                    let state = self.state.read().unwrap();
                    if !self.still_current(&state, &started_from) {
                        // Logout won while we were suspended
                        return Ok(());
                    }
                    state.principal.clone()
                };
                let Some(principal) = principal else {
                    return Ok(());
                };

                let credential = self.decode_or_wrap(&resp.credential, &principal);
                {
                    let mut state = self.state.write().unwrap();
                    if !self.still_current(&state, &started_from) {
                        return Ok(());
                    }
                    state.credential = Some(credential.clone());
                }
                self.adapter.set_string(keys::TOKEN, credential.raw());
                self.publish();
                self.bridge
                    .broadcast(&SyncEvent::session_updated(credential.raw(), &principal));
                Ok(())
            }
            Err(e) => {
                let still_current = {
                    let state = self.state.read().unwrap();
                    self.still_current(&state, &started_from)
                };
                if still_current {
                    tracing::warn!(error = %e, "Refresh failed; ending session");
                    self.set_status(SessionStatus::Expired);
                    self.logout().await;
                }
                Err(AuthFailure::new(format!("Refresh failed: {}", e)))
            }
        }
    }

    /// Apply a partial profile update
    ///
    /// Touches only the principal: credential and status are unchanged.
    pub async fn update_principal(&self, update: PrincipalUpdate) -> Result<(), AuthFailure> {
        let credential_raw = {
            let state = self.state.read().unwrap();
            match (&state.status, &state.credential) {
                (SessionStatus::Authenticated, Some(credential)) => {
                    credential.raw().to_string()
                }
                _ => return Err(AuthFailure::new("Not signed in")),
            }
        };

        match self.auth.update_profile(&credential_raw, &update).await {
            // The service echoes the merged principal; the local merge
            // applies the same fields, so the echo is not re-applied
            Ok(_echoed) => {
                let (principal, credential_raw) = {
                    let mut state = self.state.write().unwrap();
                    if state.status != SessionStatus::Authenticated {
                        // Logged out while the update was in flight
                        return Ok(());
                    }
                    let Some(principal) = state.principal.as_mut() else {
                        return Ok(());
                    };
                    principal.merge(&update);
                    (principal.clone(), credential_raw)
                };
                self.adapter.set_json(keys::CURRENT_USER, &principal);
                self.publish();
                self.bridge
                    .broadcast(&SyncEvent::session_updated(&credential_raw, &principal));
                Ok(())
            }
            Err(e) => Err(AuthFailure::new(e.0)),
        }
    }

    // Internal: whether the session the operation started from is still
    // the current one (logout or a competing login may have replaced it)
    fn still_current(&self, state: &SessionState, started_from: &str) -> bool {
        state.status == SessionStatus::Authenticated
            && state.credential.as_ref().map(Credential::raw) == Some(started_from)
    }

    // Internal: move into Authenticated with a freshly exchanged session
    fn establish(
        &self,
        raw_credential: Option<String>,
        principal: Principal,
        profile_complete: Option<bool>,
    ) {
        let credential = match raw_credential {
            Some(raw) => self.decode_or_wrap(&raw, &principal),
            None => {
                tracing::debug!(
                    subject_id = %principal.subject_id,
                    "Exchange returned no credential; synthesizing fallback"
                );
                Credential::synthesize(
                    &principal.subject_id,
                    Some(&principal.email),
                    self.config.fallback_ttl(),
                    &self.config.fallback_issuer,
                )
            }
        };

        {
            let mut state = self.state.write().unwrap();
            state.credential = Some(credential.clone());
            state.principal = Some(principal.clone());
            state.status = SessionStatus::Authenticated;
        }

        self.adapter.set_string(keys::TOKEN, credential.raw());
        self.adapter.set_json(keys::CURRENT_USER, &principal);
        self.adapter.set_string(keys::IS_AUTHENTICATED, "true");
        if let Some(complete) = profile_complete {
            self.adapter
                .set_string(keys::PROFILE_COMPLETE, if complete { "true" } else { "false" });
        }

        self.publish();
        self.bridge
            .broadcast(&SyncEvent::session_updated(credential.raw(), &principal));
    }

    // Internal: decode a service-issued token, wrapping opaque ones with
    // locally derived claims so the expiry policy still has something to
    // work with
    fn decode_or_wrap(&self, raw: &str, principal: &Principal) -> Credential {
        match Credential::decode(raw) {
            Ok(credential) => credential,
            Err(e) => {
                tracing::debug!(error = %e, "Issued credential is opaque; deriving claims locally");
                Credential::from_opaque(
                    raw,
                    &principal.subject_id,
                    Some(&principal.email),
                    self.config.fallback_ttl(),
                    &self.config.fallback_issuer,
                )
            }
        }
    }

    // Internal: remove every persisted session key, mirrors included
    fn purge_persisted(&self) {
        self.adapter.remove(keys::TOKEN);
        self.adapter.remove(keys::CURRENT_USER);
        self.adapter.remove(keys::IS_AUTHENTICATED);
        self.adapter.remove(keys::PROFILE_COMPLETE);
    }

    // Internal: enter `Authenticating`, remembering the status to fall
    // back to if the exchange fails. The credential and principal are
    // left in place so a failed re-login cannot tear down a live
    // session while its persisted record survives.
    fn begin_authenticating(&self) -> SessionStatus {
        let prior = self.state.read().unwrap().status;
        self.set_status(SessionStatus::Authenticating);
        prior
    }

    // Internal: unwind a failed exchange. A session that was live before
    // the attempt stays live; anything else settles to `Unauthenticated`.
    fn fail_authenticating(&self, prior_status: SessionStatus) {
        let settled = if prior_status == SessionStatus::Authenticated {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        };
        self.set_status(settled);
    }

    fn set_status(&self, status: SessionStatus) {
        {
            let mut state = self.state.write().unwrap();
            state.status = status;
            if status == SessionStatus::Unauthenticated {
                state.credential = None;
                state.principal = None;
            }
        }
        self.publish();
    }

    fn finish_loading(
        &self,
        status: SessionStatus,
        credential: Option<Credential>,
        principal: Option<Principal>,
    ) {
        {
            let mut state = self.state.write().unwrap();
            state.status = status;
            state.credential = credential;
            state.principal = principal;
            state.is_loading = false;
        }
        self.publish();
    }

    fn publish(&self) {
        self.watch_tx.send_replace(self.snapshot());
    }
}
