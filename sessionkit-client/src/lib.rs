//! Sessionkit Client
//!
//! Client-side session lifecycle manager: establishes, persists,
//! validates, refreshes, and revokes a user's credential across page
//! reloads and a cooperating external agent. The in-memory session is
//! authoritative for the current tab; the durable store is a best-effort
//! mirror, and the sync bridge fans changes out to the agent.

pub mod auth;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod sync;

pub use auth::{
    AuthService, ExchangeError, ExchangeResponse, FederatedResponse, LoginRequest,
    RefreshResponse,
};
pub use config::SessionConfig;
pub use error::{AuthFailure, ClientError};
pub use scheduler::RefreshScheduler;
pub use session::{SessionManager, SessionSnapshot, SessionStatus};
pub use storage::{InMemoryStore, KeyValueStore, StoreAdapter};
pub use sync::{SyncBridge, SyncEvent, SyncNotifier};
