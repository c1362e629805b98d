//! Expiration guards
//!
//! A guard decorates a [`Component`]: it checks the cached expiration at each
//! observation point (attach, and focus for [`ExpirationGuard`]), fires the
//! configured callbacks and forces a logout when the token is expired.
//! Hosting frameworks call `on_attach`/`on_focus` from their own lifecycle
//! hooks and `render` when they draw.

pub mod expiration;
pub mod mount;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use authsession_common::Clock;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::error;

use crate::ports::TokenCache;

pub use expiration::{with_tokens_expiration_access, ExpirationGuard, GuardOptions};
pub use mount::{with_minimum_expiration_time, MountExpirationGuard, MountGuardOptions};

/// Something that renders output from props.
pub trait Component: Send + Sync {
    /// Input handed through by the guard
    type Props;
    /// Rendered result
    type Output;

    /// Render `props`
    fn render(&self, props: &Self::Props) -> Self::Output;
}

/// Session logout as seen by a guard.
#[async_trait]
pub trait LogoutAction: Send + Sync {
    /// End the session; failures are handled by the implementor.
    async fn logout(&self);
}

/// Async user callback. Errors are logged by the guard, never propagated.
pub type GuardCallback = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Box a closure returning a future into a [`GuardCallback`].
pub fn callback<F, Fut>(f: F) -> GuardCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

pub(crate) async fn run_callback(name: &'static str, callback: Option<&GuardCallback>) {
    if let Some(callback) = callback {
        if let Err(err) = callback().await {
            error!(callback = name, error = %err, "guard callback failed");
        }
    }
}

/// What a guard needs from the session.
#[derive(Clone)]
pub struct GuardContext {
    cache: Arc<dyn TokenCache>,
    session: Arc<dyn LogoutAction>,
    clock: Arc<dyn Clock>,
}

impl GuardContext {
    /// Context over the session's cache and logout path
    pub fn new(
        cache: Arc<dyn TokenCache>,
        session: Arc<dyn LogoutAction>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { cache, session, clock }
    }
}

/// Outcome of one guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No expiration cached.
    NoSession,
    /// Outside every threshold
    Valid,
    /// Near-expiration callback ran
    NearExpiration,
    /// Expired callback ran and logout was forced.
    Expired,
    /// An expired cycle was already in flight on this guard.
    AlreadyRunning,
    /// The cache could not be read; nothing was done.
    Failed,
}
