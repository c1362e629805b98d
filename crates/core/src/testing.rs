//! In-memory fakes for the session ports
//!
//! Enabled for unit tests and, through the `test-utils` feature, for
//! integration tests in this and downstream crates.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use authsession_domain::{InAppBrowserConfig, OAuthConfig, Result, SessionError, TokenBundle};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use crate::guard::LogoutAction;
use crate::ports::{IdentityProvider, InAppBrowser, KeyValueStore};

/// Key-value store with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
    removes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing failure injection.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of `remove_item` calls, failed ones included.
    pub fn remove_calls(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SessionError::Cache(format!("injected read failure for {key}")));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SessionError::Cache(format!("injected write failure for {key}")));
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(SessionError::Cache(format!("injected remove failure for {key}")));
        }
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Identity provider returning scripted results.
#[derive(Debug)]
pub struct MockIdentityProvider {
    authorize_response: Mutex<Result<TokenBundle>>,
    refresh_response: Mutex<Result<TokenBundle>>,
    authorize_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_tokens: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Arc<Notify>,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self {
            authorize_response: Mutex::new(Err(SessionError::Provider(String::new()))),
            refresh_response: Mutex::new(Err(SessionError::Provider("refresh rejected".into()))),
            authorize_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_tokens: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            entered: Arc::new(Notify::new()),
        }
    }
}

impl MockIdentityProvider {
    /// Provider whose authorize and refresh both fail.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorize(self, response: Result<TokenBundle>) -> Self {
        *self.authorize_response.lock() = response;
        self
    }

    pub fn with_refresh(self, response: Result<TokenBundle>) -> Self {
        *self.refresh_response.lock() = response;
        self
    }

    pub fn set_authorize(&self, response: Result<TokenBundle>) {
        *self.authorize_response.lock() = response;
    }

    /// Hold every authorize call until the returned handle is notified.
    pub fn hold_authorize(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Notified each time an authorize call starts.
    pub fn authorize_entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens(&self) -> Vec<String> {
        self.refresh_tokens.lock().clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn authorize(&self, _config: &OAuthConfig) -> Result<TokenBundle> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.authorize_response.lock().clone()
    }

    async fn refresh(&self, _config: &OAuthConfig, refresh_token: &str) -> Result<TokenBundle> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens.lock().push(refresh_token.to_string());
        self.refresh_response.lock().clone()
    }
}

/// In-app browser recording opened URLs.
#[derive(Debug)]
pub struct MockBrowser {
    available: AtomicBool,
    open_error: Mutex<Option<String>>,
    opened: Mutex<Vec<String>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            open_error: Mutex::new(None),
            opened: Mutex::new(Vec::new()),
        }
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        let browser = Self::default();
        browser.available.store(false, Ordering::SeqCst);
        browser
    }

    pub fn fail_open(&self, message: &str) {
        *self.open_error.lock() = Some(message.to_string());
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl InAppBrowser for MockBrowser {
    async fn is_available(&self) -> Result<bool> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn open(&self, url: &str, _config: &InAppBrowserConfig) -> Result<()> {
        if let Some(message) = self.open_error.lock().clone() {
            return Err(SessionError::Browser(message));
        }
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

/// Logout action counting invocations.
#[derive(Debug, Default)]
pub struct CountingLogout {
    calls: AtomicUsize,
}

impl CountingLogout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogoutAction for CountingLogout {
    async fn logout(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Bundle whose expiration date is `millis`, in RFC 3339.
pub fn bundle_expiring_at(millis: i64) -> TokenBundle {
    let date = DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();
    TokenBundle::new("access-token-1")
        .with_expiration_date(date)
        .with_token_type("Bearer")
        .with_scopes(["openid", "profile", "email"])
}

/// Unsigned JWT carrying `claims` as its payload.
pub fn unsigned_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.signature")
}
