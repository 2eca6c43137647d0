//! Shared test fixtures: a programmable mock auth service and a
//! fully wired session manager over an in-memory store

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use sessionkit_client::auth::{
    AuthService, ExchangeError, ExchangeResponse, FederatedResponse, LoginRequest,
    RefreshResponse,
};
use sessionkit_client::{
    InMemoryStore, SessionConfig, SessionManager, StoreAdapter, SyncBridge,
};
use sessionkit_core::{Principal, PrincipalUpdate};

/// Remote auth service double with programmable responses and
/// invocation counters
pub struct MockAuthService {
    pub login_result: Mutex<Result<ExchangeResponse, ExchangeError>>,
    pub federated_result: Mutex<Result<FederatedResponse, ExchangeError>>,
    pub refresh_result: Mutex<Result<RefreshResponse, ExchangeError>>,
    pub revoke_result: Mutex<Result<(), ExchangeError>>,
    pub update_result: Mutex<Result<Principal, ExchangeError>>,

    pub login_calls: AtomicUsize,
    pub federated_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,

    /// When set, `refresh` blocks on a permit so tests can hold an
    /// exchange in flight
    pub refresh_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Default for MockAuthService {
    fn default() -> Self {
        Self {
            login_result: Mutex::new(Err(ExchangeError("no login stub".into()))),
            federated_result: Mutex::new(Err(ExchangeError("no federated stub".into()))),
            refresh_result: Mutex::new(Err(ExchangeError("no refresh stub".into()))),
            revoke_result: Mutex::new(Ok(())),
            update_result: Mutex::new(Err(ExchangeError("no update stub".into()))),
            login_calls: AtomicUsize::new(0),
            federated_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            refresh_gate: Mutex::new(None),
        }
    }
}

impl MockAuthService {
    pub fn stub_login(&self, result: Result<ExchangeResponse, ExchangeError>) {
        *self.login_result.lock().unwrap() = result;
    }

    pub fn stub_federated(&self, result: Result<FederatedResponse, ExchangeError>) {
        *self.federated_result.lock().unwrap() = result;
    }

    pub fn stub_refresh(&self, result: Result<RefreshResponse, ExchangeError>) {
        *self.refresh_result.lock().unwrap() = result;
    }

    pub fn stub_revoke(&self, result: Result<(), ExchangeError>) {
        *self.revoke_result.lock().unwrap() = result;
    }

    pub fn stub_update(&self, result: Result<Principal, ExchangeError>) {
        *self.update_result.lock().unwrap() = result;
    }

    /// Hold refreshes in flight until the returned semaphore gets permits
    pub fn gate_refresh(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.refresh_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn login(&self, _request: &LoginRequest) -> Result<ExchangeResponse, ExchangeError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_result.lock().unwrap().clone()
    }

    async fn federated_login(
        &self,
        _assertion: &str,
    ) -> Result<FederatedResponse, ExchangeError> {
        self.federated_calls.fetch_add(1, Ordering::SeqCst);
        self.federated_result.lock().unwrap().clone()
    }

    async fn refresh(&self, _credential: &str) -> Result<RefreshResponse, ExchangeError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|_| {
                ExchangeError("refresh gate closed".into())
            })?;
            permit.forget();
        }

        self.refresh_result.lock().unwrap().clone()
    }

    async fn revoke(&self, _credential: &str) -> Result<(), ExchangeError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.revoke_result.lock().unwrap().clone()
    }

    async fn update_profile(
        &self,
        _credential: &str,
        _update: &PrincipalUpdate,
    ) -> Result<Principal, ExchangeError> {
        self.update_result.lock().unwrap().clone()
    }
}

/// A fully wired manager plus handles to its collaborators
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub auth: Arc<MockAuthService>,
    pub manager: Arc<SessionManager>,
}

pub fn create_harness() -> TestHarness {
    let store = Arc::new(InMemoryStore::new());
    let auth = Arc::new(MockAuthService::default());
    let adapter = StoreAdapter::new(store.clone());
    let (bridge, _cell) = SyncBridge::standard(adapter.clone());

    let manager = Arc::new(SessionManager::new(
        adapter,
        auth.clone(),
        bridge,
        SessionConfig::default(),
    ));

    TestHarness {
        store,
        auth,
        manager,
    }
}

/// Encode a service-style credential with the given expiry
pub fn make_token(subject_id: &str, email: &str, expires_at: i64) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"subjectId":"{}","email":"{}","issuedAt":0,"expiresAt":{}}}"#,
        subject_id, email, expires_at
    ));
    format!("{}.{}.signature", header, payload)
}

pub fn make_principal(subject_id: &str, email: &str) -> Principal {
    Principal {
        subject_id: subject_id.to_string(),
        email: email.to_string(),
        display_name: None,
    }
}

/// Write an authenticated record directly into the store, as a previous
/// tab session would have left it
pub fn persist_session(store: &InMemoryStore, token: &str, principal: &Principal) {
    use sessionkit_client::KeyValueStore;

    store.set("token", token).unwrap();
    store
        .set("currentUser", &serde_json::to_string(principal).unwrap())
        .unwrap();
    store.set("isAuthenticated", "true").unwrap();
}

/// One hour from now, in Unix seconds
pub fn in_one_hour() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

/// One hour ago, in Unix seconds
pub fn one_hour_ago() -> i64 {
    chrono::Utc::now().timestamp() - 3600
}
