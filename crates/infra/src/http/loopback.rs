//! Loopback redirect capture
//!
//! Binds the host and port named by a loopback `redirect_url`, opens the
//! authorization URL in the browser and waits for the provider to redirect
//! back. The captured query string is returned appended to the redirect URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authsession_core::InAppBrowser;
use authsession_domain::{InAppBrowserConfig, Result, SessionError};
use axum::extract::RawQuery;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use super::provider::AuthorizationAgent;
use crate::errors::InfraError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Complete</title></head>
<body><h1>Authorization Complete</h1><p>You can close this window.</p></body>
</html>"#;

/// Agent capturing the redirect on a local HTTP listener.
pub struct LoopbackAgent {
    browser: Arc<dyn InAppBrowser>,
    browser_config: InAppBrowserConfig,
    timeout: Duration,
}

impl LoopbackAgent {
    /// Agent that opens `browser` and listens on the redirect URL's port.
    pub fn new(browser: Arc<dyn InAppBrowser>, browser_config: InAppBrowserConfig) -> Self {
        Self { browser, browser_config, timeout: DEFAULT_TIMEOUT }
    }

    /// How long to wait for the redirect once the browser is open.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AuthorizationAgent for LoopbackAgent {
    async fn authorize(&self, authorization_url: &str, redirect_url: &str) -> Result<String> {
        let mut redirect = Url::parse(redirect_url)
            .map_err(|err| SessionError::Config(format!("invalid redirect_url: {err}")))?;
        let server = CallbackServer::start(&redirect).await?;

        if !self.browser.is_available().await? {
            return Err(SessionError::Browser(
                authsession_domain::constants::BROWSER_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }
        self.browser.open(authorization_url, &self.browser_config).await?;
        info!(redirect = %redirect_url, "waiting for authorization redirect");

        let query = server.wait(self.timeout).await?;
        redirect.set_query(query.as_deref());
        Ok(redirect.into())
    }
}

struct CallbackServer {
    receiver: Option<oneshot::Receiver<Option<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    async fn start(redirect: &Url) -> Result<Self> {
        let host = redirect.host_str().unwrap_or_default().trim_matches(['[', ']']).to_string();
        if !matches!(host.as_str(), "127.0.0.1" | "localhost" | "::1") {
            return Err(SessionError::Config(format!(
                "redirect_url host '{host}' is not a loopback address"
            )));
        }
        let port = redirect.port_or_known_default().unwrap_or(80);
        let path = match redirect.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        let listener = TcpListener::bind((host.as_str(), port)).await.map_err(InfraError::from)?;
        debug!(%host, port, %path, "loopback listener bound");

        let (query_tx, query_rx) = oneshot::channel();
        let query_tx = Arc::new(Mutex::new(Some(query_tx)));
        let app = Router::new().route(
            &path,
            get(move |RawQuery(query): RawQuery| {
                let query_tx = query_tx.clone();
                async move {
                    if let Some(sender) = query_tx.lock().take() {
                        let _ = sender.send(query);
                    }
                    Html(SUCCESS_PAGE)
                }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "loopback callback server error");
            }
        });

        Ok(Self { receiver: Some(query_rx), shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    async fn wait(mut self, timeout: Duration) -> Result<Option<String>> {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| SessionError::Provider("redirect already consumed".to_string()))?;
        let outcome = tokio::time::timeout(timeout, receiver).await;
        self.shutdown().await;

        match outcome {
            Ok(Ok(query)) => Ok(query),
            Ok(Err(_)) => Err(SessionError::Provider("callback server stopped".to_string())),
            Err(_) => Err(SessionError::Provider(
                "timed out waiting for authorization redirect".to_string(),
            )),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "loopback callback server task failed");
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}
