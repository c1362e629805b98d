//! Integration tests for the session lifecycle across controller, context
//! and guards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use authsession_common::MockClock;
use authsession_core::policy::minutes_to_ms;
use authsession_core::testing::{
    bundle_expiring_at, unsigned_jwt, MemoryKeyValueStore, MockBrowser, MockIdentityProvider,
};
use authsession_core::{
    callback, with_minimum_expiration_time, with_tokens_expiration_access, Component,
    GuardOptions, GuardOutcome, KeyValueTokenCache, MountGuardOptions, SessionController,
    SessionProvider, TokenCache, TokenStore,
};
use authsession_domain::constants::{OAUTH_TOKENS_EXPIRATION_KEY, OAUTH_TOKENS_KEY};
use authsession_domain::{OAuthConfig, SessionConfig, SessionPhase};
use serde_json::json;

const NOW: i64 = 1_700_000_000_000;

struct Fixture {
    kv: Arc<MemoryKeyValueStore>,
    idp: Arc<MockIdentityProvider>,
    browser: Arc<MockBrowser>,
    clock: MockClock,
    provider: SessionProvider,
}

fn config(logout_url: &str) -> SessionConfig {
    SessionConfig {
        oauth: OAuthConfig {
            issuer: "https://login.example.com".into(),
            client_id: "mobile-app".into(),
            redirect_url: "com.example.app://callback".into(),
            scopes: vec!["openid".into(), "profile".into()],
            ..OAuthConfig::default()
        },
        logout_url: logout_url.into(),
        ..SessionConfig::default()
    }
}

fn fixture(idp: MockIdentityProvider, logout_url: &str) -> Fixture {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let idp = Arc::new(idp);
    let browser = Arc::new(MockBrowser::new());
    let clock = MockClock::at_millis(NOW);
    let store = TokenStore::new(
        Arc::new(KeyValueTokenCache::new(kv.clone())),
        idp.clone(),
        browser.clone(),
        &config(logout_url),
    )
    .with_clock(Arc::new(clock.clone()));
    let provider = SessionProvider::new(SessionController::new(Arc::new(store)));
    Fixture { kv, idp, browser, clock, provider }
}

struct Dashboard;

impl Component for Dashboard {
    type Props = ();
    type Output = &'static str;

    fn render(&self, _props: &()) -> &'static str {
        "dashboard"
    }
}

/// Validates the first attach with an empty cache.
///
/// Assertions:
/// - Ensures authorize runs exactly once before loading clears.
/// - Ensures the resulting bundle is persisted as two cache entries.
/// - Ensures identity claims are decoded into the snapshot.
#[tokio::test]
async fn first_attach_authorizes_and_persists() {
    let id_token = unsigned_jwt(&json!({ "sub": "user-42", "email": "ada@example.com" }));
    let bundle = bundle_expiring_at(NOW + minutes_to_ms(60.0)).with_id_token(id_token);
    let f = fixture(MockIdentityProvider::new().with_authorize(Ok(bundle)), "");
    let mut handle = f.provider.handle();

    let attach = f.provider.spawn_attach();
    let settled = handle.wait_for(|snapshot| !snapshot.loading).await.unwrap();
    attach.await.unwrap();

    assert_eq!(f.idp.authorize_calls(), 1);
    assert!(settled.is_logged());
    assert_eq!(settled.phase, SessionPhase::LoggedIn);
    assert_eq!(settled.user_claims.as_ref().and_then(|c| c.subject()), Some("user-42"));

    let stored: serde_json::Value =
        serde_json::from_str(&f.kv.raw(OAUTH_TOKENS_KEY).unwrap()).unwrap();
    assert_eq!(stored["accessToken"], "access-token-1");
    assert_eq!(
        f.kv.raw(OAUTH_TOKENS_EXPIRATION_KEY),
        Some((NOW + minutes_to_ms(60.0)).to_string())
    );
}

/// Validates that an expired cached token is refreshed on attach.
///
/// Assertions:
/// - Ensures refresh runs with the cached refresh token.
/// - Ensures authorize is not needed.
#[tokio::test]
async fn expired_cache_is_refreshed_on_attach() {
    let refreshed = bundle_expiring_at(NOW + minutes_to_ms(60.0)).with_refresh_token("refresh-2");
    let f = fixture(MockIdentityProvider::new().with_refresh(Ok(refreshed)), "");
    let cache = KeyValueTokenCache::new(f.kv.clone());
    cache
        .store(&bundle_expiring_at(NOW - 1_000).with_refresh_token("refresh-1"))
        .await
        .unwrap();

    f.provider.attach().await;
    let handle = f.provider.handle();

    assert!(handle.is_logged());
    assert_eq!(f.idp.refresh_tokens(), vec!["refresh-1".to_string()]);
    assert_eq!(f.idp.authorize_calls(), 0);
    assert_eq!(
        f.kv.raw(OAUTH_TOKENS_EXPIRATION_KEY),
        Some((NOW + minutes_to_ms(60.0)).to_string())
    );
}

/// Validates the guard forcing logout through the shared session.
///
/// Assertions:
/// - Ensures the expired callback runs once and the cache is cleared.
/// - Ensures the logged-in to logged-out flip re-validates and authorizes
///   again once the guard cycle has returned.
#[tokio::test]
async fn guard_logout_flows_through_session() {
    let f = fixture(
        MockIdentityProvider::new().with_authorize(Ok(bundle_expiring_at(NOW + minutes_to_ms(60.0)))),
        "https://login.example.com/v2/logout",
    );
    f.provider.attach().await;
    let mut handle = f.provider.handle();
    assert!(handle.is_logged());

    let fired = Arc::new(AtomicUsize::new(0));
    let options = GuardOptions::new().expired_minutes(5.0).on_token_expired({
        let fired = fired.clone();
        callback(move || {
            let fired = fired.clone();
            async move {
                fired.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    });
    let guard = with_tokens_expiration_access(Dashboard, options, handle.guard_context());

    assert_eq!(guard.on_attach().await, GuardOutcome::Valid);
    assert_eq!(guard.render(&()), Some("dashboard"));

    f.clock.advance(Duration::from_secs(56 * 60));
    assert_eq!(guard.on_focus().await, GuardOutcome::Expired);

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(f.browser.opened(), vec!["https://login.example.com/v2/logout".to_string()]);

    let settled = handle.wait_for(|snapshot| !snapshot.loading).await.unwrap();
    assert_eq!(f.idp.authorize_calls(), 2);
    assert!(settled.is_logged());
}

/// Validates that a forced logout does not hold the guard while the user
/// signs in again.
///
/// Assertions:
/// - Ensures the guard check completes while the new authorize is pending.
/// - Ensures the guard renders and its latch is released.
/// - Ensures the session settles once the login completes.
#[tokio::test]
async fn guard_check_completes_while_login_is_pending() {
    let f = fixture(
        MockIdentityProvider::new().with_authorize(Ok(bundle_expiring_at(NOW + minutes_to_ms(60.0)))),
        "",
    );
    KeyValueTokenCache::new(f.kv.clone())
        .store(&bundle_expiring_at(NOW + minutes_to_ms(10.0)))
        .await
        .unwrap();
    f.provider.attach().await;
    let mut handle = f.provider.handle();
    assert!(handle.is_logged());
    assert_eq!(f.idp.authorize_calls(), 0);

    let gate = f.idp.hold_authorize();
    let entered = f.idp.authorize_entered();
    f.clock.advance(Duration::from_secs(11 * 60));
    let guard = with_tokens_expiration_access(Dashboard, GuardOptions::new(), handle.guard_context());

    let outcome = tokio::time::timeout(Duration::from_secs(1), guard.on_attach())
        .await
        .expect("guard check waited for the new login");
    assert_eq!(outcome, GuardOutcome::Expired);
    assert!(!guard.is_checking());
    assert_eq!(guard.render(&()), Some("dashboard"));

    entered.notified().await;
    assert_eq!(f.idp.authorize_calls(), 1);
    assert!(!handle.is_logged());

    gate.notify_one();
    let settled = handle.wait_for(|snapshot| !snapshot.loading).await.unwrap();
    assert!(settled.is_logged());
}

#[tokio::test]
async fn mount_guard_uses_shared_session() {
    let f = fixture(
        MockIdentityProvider::new().with_authorize(Ok(bundle_expiring_at(NOW + minutes_to_ms(90.0)))),
        "",
    );
    f.provider.attach().await;
    let handle = f.provider.handle();
    f.idp.set_authorize(Err(authsession_domain::SessionError::Provider("user cancelled".into())));

    let guard =
        with_minimum_expiration_time(Dashboard, MountGuardOptions::default(), handle.guard_context());
    assert_eq!(guard.on_attach().await, GuardOutcome::Expired);
    assert_eq!(guard.render(&()), "dashboard");

    let snapshot = handle.peek();
    assert!(!snapshot.is_logged());
    assert_eq!(snapshot.error.as_deref(), Some("user cancelled"));
    assert_eq!(f.kv.raw(OAUTH_TOKENS_KEY), None);
}

/// Validates that repeated logout from a logged-out state is harmless.
///
/// Assertions:
/// - Ensures each call clears the cache again.
/// - Ensures the snapshot returns to the unauthenticated default.
#[tokio::test]
async fn repeated_logout_is_idempotent() {
    let f = fixture(MockIdentityProvider::new(), "");
    f.provider.attach().await;
    let handle = f.provider.handle();
    let removes = f.kv.remove_calls();

    handle.handle_logout().await;
    handle.handle_logout().await;

    assert_eq!(f.kv.remove_calls(), removes + 4);
    let snapshot = handle.peek();
    assert!(!snapshot.is_logged());
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.phase, SessionPhase::LoggedOut);
}
