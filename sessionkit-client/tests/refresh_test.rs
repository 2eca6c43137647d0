//! Credential refresh: dedup, failure handling, and logout-wins

mod common;

use std::sync::atomic::Ordering;

use common::{create_harness, in_one_hour, make_principal, make_token, persist_session};
use sessionkit_client::auth::{ExchangeError, RefreshResponse};
use sessionkit_client::{KeyValueStore, SessionStatus};

/// Successful refresh swaps the credential and re-persists it
#[tokio::test]
async fn test_refresh_success() {
    let h = create_harness();
    let old_token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &old_token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    let new_token = make_token("u-1", "a@b.com", in_one_hour() + 3600);
    h.auth.stub_refresh(Ok(RefreshResponse {
        credential: new_token.clone(),
    }));

    h.manager.clone().refresh().await.unwrap();

    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Authenticated);
    assert_eq!(snapshot.credential.unwrap().raw(), new_token);
    assert_eq!(h.store.get("token").unwrap().as_deref(), Some(new_token.as_str()));
}

/// Two overlapping refresh calls produce exactly one remote exchange
#[tokio::test]
async fn test_overlapping_refreshes_deduplicate() {
    let h = create_harness();
    let token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    let gate = h.auth.gate_refresh();
    h.auth.stub_refresh(Ok(RefreshResponse {
        credential: make_token("u-1", "a@b.com", in_one_hour() + 3600),
    }));

    let m1 = h.manager.clone();
    let m2 = h.manager.clone();
    let first = tokio::spawn(async move { m1.refresh().await });
    let second = tokio::spawn(async move { m2.refresh().await });

    // Let both callers reach the memoized future, then release the gate
    tokio::task::yield_now().await;
    gate.add_permits(1);

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(h.auth.refresh_calls.load(Ordering::SeqCst), 1);
}

/// The memo clears once a refresh settles: the next call exchanges again
#[tokio::test]
async fn test_sequential_refreshes_are_separate_exchanges() {
    let h = create_harness();
    let token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    h.auth.stub_refresh(Ok(RefreshResponse {
        credential: make_token("u-1", "a@b.com", in_one_hour() + 3600),
    }));

    h.manager.clone().refresh().await.unwrap();
    h.manager.clone().refresh().await.unwrap();

    assert_eq!(h.auth.refresh_calls.load(Ordering::SeqCst), 2);
}

/// A rejected refresh ends the session: state cleared, storage purged
#[tokio::test]
async fn test_refresh_failure_forces_logout() {
    let h = create_harness();
    let token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    h.auth.stub_refresh(Err(ExchangeError("token revoked".into())));

    let failure = h.manager.clone().refresh().await.unwrap_err();
    assert!(failure.message.contains("token revoked"));

    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    assert!(snapshot.credential.is_none());
    assert_eq!(h.store.get("token").unwrap(), None);
    assert_eq!(h.store.get("isAuthenticated").unwrap(), None);
}

/// After the failure path settles, both overlapping callers saw it
#[tokio::test]
async fn test_overlapping_refresh_failure_shared() {
    let h = create_harness();
    let token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    let gate = h.auth.gate_refresh();
    h.auth.stub_refresh(Err(ExchangeError("boom".into())));

    let m1 = h.manager.clone();
    let m2 = h.manager.clone();
    let first = tokio::spawn(async move { m1.refresh().await });
    let second = tokio::spawn(async move { m2.refresh().await });

    tokio::task::yield_now().await;
    gate.add_permits(1);

    assert!(first.await.unwrap().is_err());
    assert!(second.await.unwrap().is_err());
    assert_eq!(h.auth.refresh_calls.load(Ordering::SeqCst), 1);
}

/// Logout issued while a refresh is in flight wins: the session ends
/// unauthenticated and the late refresh result is discarded
#[tokio::test]
async fn test_logout_wins_over_inflight_refresh() {
    let h = create_harness();
    let token = make_token("u-1", "a@b.com", in_one_hour());
    persist_session(&*h.store, &token, &make_principal("u-1", "a@b.com"));
    h.manager.initialize();

    let gate = h.auth.gate_refresh();
    h.auth.stub_refresh(Ok(RefreshResponse {
        credential: make_token("u-1", "a@b.com", in_one_hour() + 3600),
    }));

    let m = h.manager.clone();
    let refresh_task = tokio::spawn(async move { m.refresh().await });
    tokio::task::yield_now().await;

    // Logout while the exchange is suspended on the gate
    h.manager.logout().await;
    assert_eq!(h.manager.snapshot().status, SessionStatus::Unauthenticated);

    // Let the refresh settle; it must not resurrect the session
    gate.add_permits(1);
    refresh_task.await.unwrap().unwrap();

    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    assert!(snapshot.credential.is_none());
    assert_eq!(h.store.get("token").unwrap(), None);
}

/// Refreshing with no active session fails without a remote exchange
#[tokio::test]
async fn test_refresh_without_session() {
    let h = create_harness();
    h.manager.initialize();

    assert!(h.manager.clone().refresh().await.is_err());
    assert_eq!(h.auth.refresh_calls.load(Ordering::SeqCst), 0);
}
