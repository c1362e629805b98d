//! Token store: authorize, refresh, validate and logout orchestration

use std::sync::Arc;

use authsession_common::{Clock, SystemClock};
use authsession_domain::constants::{
    BROWSER_UNAVAILABLE_MESSAGE, CONFIG_REQUIRED, DEFAULT_AUTHORIZATION_ERROR,
    REFRESH_TOKEN_REQUIRED,
};
use authsession_domain::{
    InAppBrowserConfig, OAuthConfig, Result, SessionConfig, SessionError, SessionState,
    TokenBundle,
};
use tracing::{debug, info, warn};

use crate::claims::ClaimsDecoder;
use crate::policy::is_expired;
use crate::report::report;
use crate::ports::{IdentityProvider, InAppBrowser, TokenCache};

/// Orchestrates the identity provider, token cache and in-app browser.
///
/// Every operation produces a fresh value; the store itself holds no
/// session state beyond what is persisted in the cache.
pub struct TokenStore {
    cache: Arc<dyn TokenCache>,
    provider: Arc<dyn IdentityProvider>,
    browser: Arc<dyn InAppBrowser>,
    clock: Arc<dyn Clock>,
    decoder: ClaimsDecoder,
    oauth: OAuthConfig,
    logout_url: String,
    browser_config: InAppBrowserConfig,
}

impl TokenStore {
    /// Create a store using the system clock and the JWT claims decoder
    pub fn new(
        cache: Arc<dyn TokenCache>,
        provider: Arc<dyn IdentityProvider>,
        browser: Arc<dyn InAppBrowser>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            browser,
            clock: Arc::new(SystemClock),
            decoder: ClaimsDecoder::default(),
            oauth: config.oauth.clone(),
            logout_url: config.logout_url.clone(),
            browser_config: config.browser.clone(),
        }
    }

    /// Replace the clock (tests pin time with `MockClock`)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the claims decoder
    pub fn with_decoder(mut self, decoder: ClaimsDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Shared handle to the token cache
    pub fn cache(&self) -> Arc<dyn TokenCache> {
        Arc::clone(&self.cache)
    }

    /// Clock used for expiration checks
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Decoder applied to identity tokens
    pub const fn decoder(&self) -> &ClaimsDecoder {
        &self.decoder
    }

    /// Provider configuration this store was built with
    pub const fn oauth_config(&self) -> &OAuthConfig {
        &self.oauth
    }

    /// Current session according to the cache, refreshing when the cached
    /// access token is past its raw expiration and a refresh token exists.
    ///
    /// Never fails: a failed refresh yields a logged-out state carrying the
    /// error message.
    pub async fn validate(&self) -> SessionState {
        match self.resolve().await {
            Ok(tokens) => SessionState::from_tokens(tokens),
            Err(err) => {
                report(&err, "validate");
                SessionState::failed(err.user_message())
            }
        }
    }

    /// Cached bundle, refreshed when expired. Errors come from refresh only.
    pub(crate) async fn resolve(&self) -> Result<Option<TokenBundle>> {
        let cached = self.cache.read().await;
        let now = self.clock.millis_since_epoch();

        if let Some(refresh_token) = cached.tokens.as_ref().and_then(TokenBundle::refresh_token) {
            if is_expired(cached.expiration, 0.0, now) {
                debug!(expiration = ?cached.expiration, now, "cached access token expired, refreshing");
                let refreshed = self.refresh(refresh_token, &self.oauth).await?;
                return Ok(Some(refreshed));
            }
        }

        Ok(cached.tokens)
    }

    /// Run the interactive authorization flow and persist its result.
    ///
    /// # Errors
    /// The provider's error (a blank provider message becomes
    /// `"Authorization error"`), a `Config` error for an unusable client
    /// configuration, or the cache's error when the bundle cannot be stored.
    /// The cache is untouched when the provider fails.
    pub async fn authorize(&self) -> Result<SessionState> {
        self.oauth.validate()?;

        let tokens = self.provider.authorize(&self.oauth).await.map_err(|err| match err {
            SessionError::Provider(message) if message.trim().is_empty() => {
                SessionError::Provider(DEFAULT_AUTHORIZATION_ERROR.to_string())
            }
            other => other,
        })?;

        self.cache.store(&tokens).await?;
        info!(has_refresh_token = tokens.refresh_token().is_some(), "authorization completed");
        Ok(SessionState::from_tokens(Some(tokens)))
    }

    /// Exchange `refresh_token` for a new bundle.
    ///
    /// A failure to persist the new bundle is logged and ignored.
    ///
    /// # Errors
    /// `SessionError::Config` when the refresh token or configuration is
    /// empty; otherwise the provider's error.
    pub async fn refresh(&self, refresh_token: &str, config: &OAuthConfig) -> Result<TokenBundle> {
        if refresh_token.trim().is_empty() {
            return Err(SessionError::Config(REFRESH_TOKEN_REQUIRED.to_string()));
        }
        if config.is_empty() {
            return Err(SessionError::Config(CONFIG_REQUIRED.to_string()));
        }

        let tokens = self.provider.refresh(config, refresh_token).await?;

        if let Err(err) = self.cache.store(&tokens).await {
            report(&err, "persist refreshed tokens");
        }
        info!("access token refreshed");
        Ok(tokens)
    }

    /// Open the provider logout page, then clear the cache regardless of the
    /// browser outcome.
    ///
    /// # Errors
    /// `SessionError::Browser` when the browser is unavailable or fails to
    /// open. The cache has been cleared even then.
    pub async fn logout(&self) -> Result<()> {
        let outcome = self.open_logout_page().await;

        if !self.cache.clear().await {
            warn!("token cache was not fully cleared on logout");
        }

        match &outcome {
            Ok(()) => info!("logged out"),
            Err(err) => report(err, "open logout page"),
        }
        outcome
    }

    async fn open_logout_page(&self) -> Result<()> {
        if self.logout_url.trim().is_empty() {
            debug!("no logout url configured, skipping browser step");
            return Ok(());
        }
        if !self.browser.is_available().await? {
            return Err(SessionError::Browser(BROWSER_UNAVAILABLE_MESSAGE.to_string()));
        }
        self.browser.open(&self.logout_url, &self.browser_config).await
    }
}
