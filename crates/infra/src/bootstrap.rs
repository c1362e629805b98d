//! Session wiring
//!
//! Assembles the core session stack from a [`SessionConfig`]: storage
//! backend, token cache, system browser, loopback agent, HTTP identity
//! provider, token store and controller.

use std::sync::Arc;
use std::time::Duration;

use authsession_common::Clock;
use authsession_core::{
    InAppBrowser, KeyValueStore, KeyValueTokenCache, SessionController, SessionProvider,
    TokenStore,
};
use authsession_domain::{Result, SessionConfig};
use tracing::info;

use crate::browser::CommandBrowser;
use crate::http::{HttpClient, HttpIdentityProvider, LoopbackAgent};
use crate::storage::build_store;

/// Builder for a ready-to-attach [`SessionProvider`].
pub struct SessionBootstrap {
    config: SessionConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    browser: Option<Arc<dyn InAppBrowser>>,
    http: Option<HttpClient>,
    clock: Option<Arc<dyn Clock>>,
    redirect_timeout: Option<Duration>,
}

impl SessionBootstrap {
    /// Start from a loaded configuration with the configured storage backend.
    pub fn new(config: SessionConfig) -> Self {
        Self { config, store: None, browser: None, http: None, clock: None, redirect_timeout: None }
    }

    /// Use this store instead of the configured backend.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this browser instead of the platform URL handler.
    pub fn with_browser(mut self, browser: Arc<dyn InAppBrowser>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Replace the token endpoint transport
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the clock used by the store and provider
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// How long the loopback agent waits for the provider redirect.
    pub fn with_redirect_timeout(mut self, timeout: Duration) -> Self {
        self.redirect_timeout = Some(timeout);
        self
    }

    /// Validate the configuration and build the token store.
    ///
    /// # Errors
    /// Returns `SessionError::Config` when the OAuth section is incomplete
    /// and `SessionError::Provider` when the HTTP client cannot be built.
    pub fn build_store(self) -> Result<TokenStore> {
        self.config.oauth.validate()?;

        let kv = self.store.unwrap_or_else(|| build_store(&self.config.storage));
        let cache = Arc::new(KeyValueTokenCache::new(kv));
        let browser: Arc<dyn InAppBrowser> =
            self.browser.unwrap_or_else(|| Arc::new(CommandBrowser::system()));

        let mut agent = LoopbackAgent::new(browser.clone(), self.config.browser.clone());
        if let Some(timeout) = self.redirect_timeout {
            agent = agent.with_timeout(timeout);
        }

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()?,
        };
        let mut provider = HttpIdentityProvider::new(http, Arc::new(agent));
        if let Some(clock) = &self.clock {
            provider = provider.with_clock(clock.clone());
        }

        let mut store = TokenStore::new(cache, Arc::new(provider), browser, &self.config);
        if let Some(clock) = self.clock {
            store = store.with_clock(clock);
        }

        info!(
            client_id = %self.config.oauth.client_id,
            backend = %self.config.storage.backend,
            "session stack assembled"
        );
        Ok(store)
    }

    /// Build the provider; call `attach` on it to start the lifecycle.
    ///
    /// # Errors
    /// See [`SessionBootstrap::build_store`].
    pub fn build(self) -> Result<SessionProvider> {
        let store = self.build_store()?;
        Ok(SessionProvider::new(SessionController::new(Arc::new(store))))
    }
}

/// Load configuration with [`crate::config::load`] and build a provider.
///
/// # Errors
/// Returns the loader's or the builder's error.
pub fn from_environment() -> Result<SessionProvider> {
    let config = crate::config::load()?;
    SessionBootstrap::new(config).build()
}
