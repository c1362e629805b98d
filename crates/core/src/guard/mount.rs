//! Mount-only expiration guard
//!
//! Checks once on attach whether fewer than `minimum_token_expiration_time`
//! minutes remain. If so, awaits the callback and forces logout. The wrapped
//! component always renders.

use authsession_common::Clock;
use authsession_domain::constants::DEFAULT_MINIMUM_TOKEN_EXPIRATION_MINUTES;
use authsession_domain::GuardConfig;
use tracing::{error, info};

use super::{run_callback, Component, GuardCallback, GuardContext, GuardOutcome};
use crate::policy::minutes_to_ms;
use crate::ports::TokenCache;

/// Configuration for [`MountExpirationGuard`].
#[derive(Clone)]
pub struct MountGuardOptions {
    /// Minutes of remaining lifetime below which the session is ended.
    pub minimum_token_expiration_time: f64,
    /// Runs before the session is ended
    pub callback: Option<GuardCallback>,
}

impl Default for MountGuardOptions {
    fn default() -> Self {
        Self { minimum_token_expiration_time: DEFAULT_MINIMUM_TOKEN_EXPIRATION_MINUTES, callback: None }
    }
}

impl MountGuardOptions {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self { minimum_token_expiration_time: config.minimum_token_expiration_time, callback: None }
    }

    pub fn minimum_minutes(mut self, minutes: f64) -> Self {
        self.minimum_token_expiration_time = minutes;
        self
    }

    pub fn callback(mut self, callback: GuardCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Runs its callback once, on attach, when the token is inside the minimum window.
pub struct MountExpirationGuard<C: Component> {
    component: C,
    options: MountGuardOptions,
    context: GuardContext,
}

/// Wrap `component` in a [`MountExpirationGuard`].
pub fn with_minimum_expiration_time<C: Component>(
    component: C,
    options: MountGuardOptions,
    context: GuardContext,
) -> MountExpirationGuard<C> {
    MountExpirationGuard { component, options, context }
}

impl<C: Component> MountExpirationGuard<C> {
    /// Check once and report whether the component may render
    pub async fn on_attach(&self) -> GuardOutcome {
        let expiration = match self.context.cache.load().await {
            Ok(cached) => cached.expiration,
            Err(err) => {
                error!(error = %err, "error verifying token expiration");
                return GuardOutcome::Failed;
            }
        };
        let Some(expiration) = expiration else {
            return GuardOutcome::NoSession;
        };

        let remaining = expiration.saturating_sub(self.context.clock.millis_since_epoch());
        if remaining > minutes_to_ms(self.options.minimum_token_expiration_time) {
            return GuardOutcome::Valid;
        }

        info!(remaining_ms = remaining, "token lifetime below minimum, forcing logout");
        run_callback("minimum_expiration_callback", self.options.callback.as_ref()).await;
        self.context.session.logout().await;
        GuardOutcome::Expired
    }
}

impl<C: Component> Component for MountExpirationGuard<C> {
    type Props = C::Props;
    type Output = C::Output;

    fn render(&self, props: &Self::Props) -> Self::Output {
        self.component.render(props)
    }
}
