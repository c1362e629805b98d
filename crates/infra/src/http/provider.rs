//! OAuth 2.0 identity provider over HTTP
//!
//! Builds the PKCE authorization request, hands it to an
//! [`AuthorizationAgent`], checks the returned `state` and exchanges the code
//! at the token endpoint. Refresh grants go to the same endpoint. Token
//! responses become [`TokenBundle`]s with an absolute expiration date.

use std::sync::Arc;

use async_trait::async_trait;
use authsession_common::pkce::{validate_state, PkceChallenge};
use authsession_common::{Clock, SystemClock};
use authsession_core::IdentityProvider;
use authsession_domain::{OAuthConfig, Result, SessionError, TokenBundle};
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::client::{HttpClient, Replay};

/// Interactive half of the authorization-code flow.
#[async_trait]
pub trait AuthorizationAgent: Send + Sync {
    /// Present `authorization_url` to the user and return the full URL the
    /// provider redirected to.
    async fn authorize(&self, authorization_url: &str, redirect_url: &str) -> Result<String>;
}

/// RFC 6749 section 5.1 token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// RFC 6749 section 5.2 error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn message(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {description}", self.error),
            None => self.error.clone(),
        }
    }
}

/// Identity provider speaking OAuth 2.0 with PKCE over HTTP.
pub struct HttpIdentityProvider {
    http: HttpClient,
    agent: Arc<dyn AuthorizationAgent>,
    clock: Arc<dyn Clock>,
}

impl HttpIdentityProvider {
    /// Provider that authorizes through `agent` and exchanges tokens over `http`.
    pub fn new(http: HttpClient, agent: Arc<dyn AuthorizationAgent>) -> Self {
        Self { http, agent, clock: Arc::new(SystemClock) }
    }

    /// Clock used to turn `expires_in` into an expiration date
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Authorization request URL for one PKCE attempt.
    pub fn authorization_url(config: &OAuthConfig, challenge: &PkceChallenge) -> String {
        let mut params = vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), config.client_id.clone()),
            ("redirect_uri".to_string(), config.redirect_url.clone()),
            ("scope".to_string(), config.scope_string()),
            ("state".to_string(), challenge.state.clone()),
            ("code_challenge".to_string(), challenge.code_challenge.clone()),
            ("code_challenge_method".to_string(), challenge.challenge_method().to_string()),
        ];
        params.extend(config.additional_parameters.iter().map(|(k, v)| (k.clone(), v.clone())));

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{query}", config.authorization_endpoint())
    }

    async fn token_request(
        &self,
        config: &OAuthConfig,
        form: &[(&str, &str)],
        replay: Replay,
    ) -> Result<TokenResponse> {
        let endpoint = config.token_endpoint();
        let response = self.http.post_form(&endpoint, form, replay).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|err| err.message())
                .unwrap_or_else(|_| format!("token endpoint returned HTTP {}", status.as_u16()));
            warn!(%endpoint, status = status.as_u16(), "token request rejected");
            return Err(SessionError::Provider(message));
        }

        response.json::<TokenResponse>().await.map_err(|err| {
            SessionError::Provider(format!("malformed token endpoint response: {err}"))
        })
    }

    fn bundle_from(&self, response: TokenResponse) -> TokenBundle {
        let mut bundle = TokenBundle::new(response.access_token);
        bundle.refresh_token = response.refresh_token;
        bundle.id_token = response.id_token;
        bundle.token_type = response.token_type;
        bundle.access_token_expiration_date = response.expires_in.and_then(|seconds| {
            let expires_at = self.clock.millis_since_epoch().saturating_add(seconds.saturating_mul(1_000));
            DateTime::from_timestamp_millis(expires_at)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        });
        if let Some(scope) = response.scope {
            bundle.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
        bundle.additional = response.extra;
        bundle
    }
}

/// Authorization code from a redirect URL, checking `state`.
fn parse_redirect(redirect: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(redirect)
        .map_err(|err| SessionError::Provider(format!("invalid redirect URL: {err}")))?;
    let param = |name: &str| {
        url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(SessionError::Provider(param("error_description").unwrap_or(error)));
    }
    let state = param("state").unwrap_or_default();
    if !validate_state(expected_state, &state) {
        return Err(SessionError::Provider("authorization state mismatch".to_string()));
    }
    param("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| SessionError::Provider("authorization response missing code".to_string()))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn authorize(&self, config: &OAuthConfig) -> Result<TokenBundle> {
        let challenge = PkceChallenge::generate();
        let url = Self::authorization_url(config, &challenge);
        debug!(endpoint = %config.authorization_endpoint(), "starting authorization request");

        let redirect = self.agent.authorize(&url, &config.redirect_url).await?;
        let code = parse_redirect(&redirect, &challenge.state)?;

        let response = self
            .token_request(
                config,
                &[
                    ("grant_type", "authorization_code"),
                    ("client_id", config.client_id.as_str()),
                    ("code", code.as_str()),
                    ("redirect_uri", config.redirect_url.as_str()),
                    ("code_verifier", challenge.code_verifier.as_str()),
                ],
                Replay::Never,
            )
            .await?;
        info!("authorization code exchanged");
        Ok(self.bundle_from(response))
    }

    /// Providers that do not rotate refresh tokens omit it from the response;
    /// the presented token is kept in that case.
    async fn refresh(&self, config: &OAuthConfig, refresh_token: &str) -> Result<TokenBundle> {
        let response = self
            .token_request(
                config,
                &[
                    ("grant_type", "refresh_token"),
                    ("client_id", config.client_id.as_str()),
                    ("refresh_token", refresh_token),
                ],
                Replay::Allowed,
            )
            .await?;
        let mut bundle = self.bundle_from(response);
        if bundle.refresh_token().is_none() {
            bundle.refresh_token = Some(refresh_token.to_string());
        }
        info!("refresh token exchanged");
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for provider.
    use std::time::Duration;

    use authsession_common::MockClock;
    use parking_lot::Mutex;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    /// Agent echoing back a redirect built from the authorization URL.
    #[derive(Default)]
    struct EchoAgent {
        seen: Mutex<Option<String>>,
        error: Option<&'static str>,
        tamper_state: bool,
    }

    #[async_trait]
    impl AuthorizationAgent for EchoAgent {
        async fn authorize(&self, authorization_url: &str, redirect_url: &str) -> Result<String> {
            *self.seen.lock() = Some(authorization_url.to_string());
            let url = Url::parse(authorization_url).unwrap();
            let state = url.query_pairs().find(|(k, _)| k == "state").unwrap().1.into_owned();
            let state = if self.tamper_state { format!("{state}x") } else { state };
            Ok(match self.error {
                Some(error) => format!("{redirect_url}?error={error}&state={state}"),
                None => format!("{redirect_url}?code=auth-code-1&state={state}"),
            })
        }
    }

    fn config(server: &MockServer) -> OAuthConfig {
        OAuthConfig {
            issuer: server.uri(),
            client_id: "mobile-app".into(),
            redirect_url: "http://127.0.0.1:7878/callback".into(),
            scopes: vec!["openid".into(), "offline_access".into()],
            ..OAuthConfig::default()
        }
    }

    fn provider(agent: Arc<EchoAgent>) -> HttpIdentityProvider {
        let http = HttpClient::builder()
            .max_attempts(1)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpIdentityProvider::new(http, agent).with_clock(Arc::new(MockClock::at_millis(NOW)))
    }

    /// Validates the full authorization-code exchange.
    ///
    /// Assertions:
    /// - Ensures the authorization URL carries PKCE and client parameters.
    /// - Ensures the token response maps onto a bundle with an absolute
    ///   expiration date.
    #[tokio::test]
    async fn authorize_exchanges_code_for_bundle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-1"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "id_token": "h.p.s",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "openid offline_access"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let agent = Arc::new(EchoAgent::default());
        let bundle = provider(agent.clone()).authorize(&config(&server)).await.unwrap();

        let seen = agent.seen.lock().clone().unwrap();
        assert!(seen.starts_with(&format!("{}/authorize?", server.uri())));
        assert!(seen.contains("code_challenge_method=S256"));
        assert!(seen.contains("client_id=mobile-app"));
        assert!(seen.contains("scope=openid%20offline_access"));

        assert_eq!(bundle.access_token(), Some("at-1"));
        assert_eq!(bundle.refresh_token(), Some("rt-1"));
        assert_eq!(bundle.expiration_millis(), Some(NOW + 3_600_000));
        assert_eq!(bundle.scopes, vec!["openid".to_string(), "offline_access".to_string()]);
    }

    #[tokio::test]
    async fn provider_error_in_redirect_is_surfaced() {
        let server = MockServer::start().await;
        let agent = Arc::new(EchoAgent { error: Some("access_denied"), ..EchoAgent::default() });

        let err = provider(agent).authorize(&config(&server)).await.unwrap_err();
        assert_eq!(err, SessionError::Provider("access_denied".into()));
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected() {
        let server = MockServer::start().await;
        let agent = Arc::new(EchoAgent { tamper_state: true, ..EchoAgent::default() });

        let err = provider(agent).authorize(&config(&server)).await.unwrap_err();
        assert_eq!(err, SessionError::Provider("authorization state mismatch".into()));
    }

    /// Validates refresh handling.
    ///
    /// Assertions:
    /// - Ensures a non-rotating provider keeps the presented refresh token.
    /// - Ensures `invalid_grant` surfaces its description.
    #[tokio::test]
    async fn refresh_keeps_token_and_maps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("refresh_token=rt-good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-2",
                "expires_in": 60
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("refresh_token=rt-revoked"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "refresh token revoked"
            })))
            .mount(&server)
            .await;

        let provider = provider(Arc::new(EchoAgent::default()));
        let config = config(&server);

        let bundle = provider.refresh(&config, "rt-good").await.unwrap();
        assert_eq!(bundle.refresh_token(), Some("rt-good"));
        assert_eq!(bundle.expiration_millis(), Some(NOW + 60_000));

        let err = provider.refresh(&config, "rt-revoked").await.unwrap_err();
        assert_eq!(err, SessionError::Provider("invalid_grant: refresh token revoked".into()));
    }

    /// Validates which grants are resent after a server error.
    ///
    /// Assertions:
    /// - Ensures the single-use code exchange is posted once.
    /// - Ensures a refresh grant is retried until the endpoint recovers.
    #[tokio::test]
    async fn only_refresh_grants_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-3",
                "expires_in": 60
            })))
            .mount(&server)
            .await;

        let http = HttpClient::builder()
            .max_attempts(3)
            .base_backoff(Duration::from_millis(5))
            .build()
            .unwrap();
        let provider = HttpIdentityProvider::new(http, Arc::new(EchoAgent::default()))
            .with_clock(Arc::new(MockClock::at_millis(NOW)));
        let config = config(&server);

        let err = provider.authorize(&config).await.unwrap_err();
        assert_eq!(err, SessionError::Provider("token endpoint returned HTTP 503".into()));

        let bundle = provider.refresh(&config, "rt-1").await.unwrap();
        assert_eq!(bundle.access_token(), Some("at-3"));
    }
}
