//! Focus-aware expiration guard
//!
//! Per trigger:
//! 1. read the cached expiration
//! 2. if expired (by `minutes_to_consider_token_as_expired`) and no expired
//!    cycle is in flight: latch, show loading, await `on_token_expired`,
//!    clear loading, await logout, release the latch
//! 3. otherwise, inside a valid near-expiration window, await
//!    `on_token_near_expiration`
//!
//! Cache failures are logged and the trigger does nothing. The wrapped
//! component renders once the first check has completed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use authsession_common::Clock;
use authsession_domain::GuardConfig;
use tracing::{debug, error, info};

use super::{run_callback, Component, GuardCallback, GuardContext, GuardOutcome};
use crate::policy::{ExpirationPolicy, ExpirationStatus};
use crate::ports::TokenCache;

/// Renders the loading view while `on_token_expired` runs.
pub type LoadingRenderer<O> = Arc<dyn Fn() -> O + Send + Sync>;

/// Configuration for [`ExpirationGuard`].
pub struct GuardOptions<O> {
    /// Minutes before raw expiration at which the token counts as expired
    pub minutes_to_consider_token_as_expired: f64,
    /// Must be finite and greater than the expired threshold to take effect.
    pub minutes_to_consider_token_as_near_expiration: Option<f64>,
    /// Runs inside the near-expiration window
    pub on_token_near_expiration: Option<GuardCallback>,
    /// Runs before the forced logout
    pub on_token_expired: Option<GuardCallback>,
    /// Shown while `on_token_expired` runs
    pub render_loading_component: Option<LoadingRenderer<O>>,
}

impl<O> Default for GuardOptions<O> {
    fn default() -> Self {
        Self {
            minutes_to_consider_token_as_expired: 0.0,
            minutes_to_consider_token_as_near_expiration: None,
            on_token_near_expiration: None,
            on_token_expired: None,
            render_loading_component: None,
        }
    }
}

impl<O> GuardOptions<O> {
    /// Options using the default thresholds and no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Thresholds taken from configuration; callbacks left unset.
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            minutes_to_consider_token_as_expired: config.minutes_to_consider_token_as_expired,
            minutes_to_consider_token_as_near_expiration: config
                .minutes_to_consider_token_as_near_expiration,
            ..Self::default()
        }
    }

    pub fn expired_minutes(mut self, minutes: f64) -> Self {
        self.minutes_to_consider_token_as_expired = minutes;
        self
    }

    pub fn near_expiration_minutes(mut self, minutes: f64) -> Self {
        self.minutes_to_consider_token_as_near_expiration = Some(minutes);
        self
    }

    pub fn on_token_expired(mut self, callback: GuardCallback) -> Self {
        self.on_token_expired = Some(callback);
        self
    }

    pub fn on_token_near_expiration(mut self, callback: GuardCallback) -> Self {
        self.on_token_near_expiration = Some(callback);
        self
    }

    pub fn render_loading_component(mut self, render: impl Fn() -> O + Send + Sync + 'static) -> Self {
        self.render_loading_component = Some(Arc::new(render));
        self
    }
}

#[derive(Debug, Default)]
struct GuardRunState {
    expired_latch: AtomicBool,
    loading: AtomicBool,
    checked: AtomicBool,
}

/// Component wrapper re-checking expiration on attach and focus.
pub struct ExpirationGuard<C: Component> {
    component: C,
    policy: ExpirationPolicy,
    options: GuardOptions<C::Output>,
    context: GuardContext,
    run_state: GuardRunState,
}

/// Wrap `component` in an [`ExpirationGuard`].
pub fn with_tokens_expiration_access<C: Component>(
    component: C,
    options: GuardOptions<C::Output>,
    context: GuardContext,
) -> ExpirationGuard<C> {
    let policy = ExpirationPolicy::new(
        options.minutes_to_consider_token_as_expired,
        options.minutes_to_consider_token_as_near_expiration,
    );
    ExpirationGuard { component, policy, options, context, run_state: GuardRunState::default() }
}

impl<C: Component> ExpirationGuard<C> {
    /// Run the first check
    pub async fn on_attach(&self) -> GuardOutcome {
        self.check().await
    }

    /// Re-check when the component regains focus
    pub async fn on_focus(&self) -> GuardOutcome {
        self.check().await
    }

    /// True until the first check has completed.
    pub fn is_checking(&self) -> bool {
        !self.run_state.checked.load(Ordering::SeqCst)
    }

    /// True while `on_token_expired` runs.
    pub fn is_loading(&self) -> bool {
        self.run_state.loading.load(Ordering::SeqCst)
    }

    /// Thresholds this guard evaluates against
    pub const fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    /// Run one check cycle.
    pub async fn check(&self) -> GuardOutcome {
        let outcome = match self.context.cache.load().await {
            Ok(cached) => self.evaluate(cached.expiration).await,
            Err(err) => {
                error!(error = %err, "error verifying token expiration");
                GuardOutcome::Failed
            }
        };
        self.run_state.checked.store(true, Ordering::SeqCst);
        debug!(?outcome, "expiration guard check completed");
        outcome
    }

    async fn evaluate(&self, expiration: Option<i64>) -> GuardOutcome {
        let now = self.context.clock.millis_since_epoch();
        match self.policy.evaluate(expiration, now) {
            ExpirationStatus::Unknown => GuardOutcome::NoSession,
            ExpirationStatus::Valid => GuardOutcome::Valid,
            ExpirationStatus::NearExpiration => {
                info!(expiration = ?expiration, now, "access token near expiration");
                run_callback("on_token_near_expiration", self.options.on_token_near_expiration.as_ref())
                    .await;
                GuardOutcome::NearExpiration
            }
            ExpirationStatus::Expired => self.expire().await,
        }
    }

    async fn expire(&self) -> GuardOutcome {
        let latched = self
            .run_state
            .expired_latch
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !latched {
            debug!("expired cycle already in flight");
            return GuardOutcome::AlreadyRunning;
        }

        info!("access token expired, forcing logout");
        self.run_state.loading.store(true, Ordering::SeqCst);
        run_callback("on_token_expired", self.options.on_token_expired.as_ref()).await;
        self.run_state.loading.store(false, Ordering::SeqCst);

        self.context.session.logout().await;
        self.run_state.expired_latch.store(false, Ordering::SeqCst);
        GuardOutcome::Expired
    }
}

impl<C: Component> Component for ExpirationGuard<C> {
    type Props = C::Props;
    type Output = Option<C::Output>;

    /// Loading view while the expired callback runs (if configured), nothing
    /// before the first check, the wrapped component otherwise.
    fn render(&self, props: &Self::Props) -> Self::Output {
        if self.is_loading() {
            if let Some(render_loading) = &self.options.render_loading_component {
                return Some(render_loading());
            }
        }
        if self.is_checking() {
            return None;
        }
        Some(self.component.render(props))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for expiration guard.
    use std::sync::atomic::AtomicUsize;

    use authsession_common::MockClock;
    use authsession_domain::constants::OAUTH_TOKENS_EXPIRATION_KEY;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::KeyValueTokenCache;
    use crate::guard::callback;
    use crate::policy::minutes_to_ms;
    use crate::testing::{CountingLogout, MemoryKeyValueStore};

    const NOW: i64 = 1_700_000_000_000;

    struct Screen;

    impl Component for Screen {
        type Props = &'static str;
        type Output = String;

        fn render(&self, props: &Self::Props) -> String {
            format!("screen:{props}")
        }
    }

    struct Harness {
        kv: Arc<MemoryKeyValueStore>,
        clock: MockClock,
        logout: Arc<CountingLogout>,
        expired: Arc<AtomicUsize>,
        near: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                kv: Arc::new(MemoryKeyValueStore::new()),
                clock: MockClock::at_millis(NOW),
                logout: Arc::new(CountingLogout::new()),
                expired: Arc::new(AtomicUsize::new(0)),
                near: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn expire_at(&self, millis: i64) {
            self.kv.insert(OAUTH_TOKENS_EXPIRATION_KEY, &millis.to_string());
        }

        fn context(&self) -> GuardContext {
            GuardContext::new(
                Arc::new(KeyValueTokenCache::new(self.kv.clone())),
                self.logout.clone(),
                Arc::new(self.clock.clone()),
            )
        }

        fn options(&self) -> GuardOptions<String> {
            let expired = self.expired.clone();
            let near = self.near.clone();
            GuardOptions::new()
                .on_token_expired(callback(move || {
                    let expired = expired.clone();
                    async move {
                        expired.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .on_token_near_expiration(callback(move || {
                    let near = near.clone();
                    async move {
                        near.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
        }

        fn counts(&self) -> (usize, usize, usize) {
            (
                self.expired.load(Ordering::SeqCst),
                self.near.load(Ordering::SeqCst),
                self.logout.calls(),
            )
        }
    }

    #[tokio::test]
    async fn renders_nothing_before_first_check() {
        let h = Harness::new();
        h.expire_at(NOW + minutes_to_ms(60.0));
        let guard = with_tokens_expiration_access(Screen, h.options(), h.context());

        assert!(guard.is_checking());
        assert_eq!(guard.render(&"home"), None);

        assert_eq!(guard.on_attach().await, GuardOutcome::Valid);
        assert_eq!(guard.render(&"home"), Some("screen:home".to_string()));
        assert_eq!(h.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn near_window_requires_valid_threshold() {
        let h = Harness::new();
        h.expire_at(NOW + minutes_to_ms(10.0));
        let guard = with_tokens_expiration_access(
            Screen,
            h.options().expired_minutes(5.0).near_expiration_minutes(5.0),
            h.context(),
        );

        assert_eq!(guard.on_attach().await, GuardOutcome::Valid);
        assert_eq!(h.counts(), (0, 0, 0));
    }

    /// Validates that focus events re-run the check.
    ///
    /// Assertions:
    /// - Ensures a token that becomes expired while attached is caught on
    ///   focus.
    /// - Ensures the latch is released so a later cycle can fire again.
    #[tokio::test]
    async fn focus_rechecks_after_time_passes() {
        let h = Harness::new();
        h.expire_at(NOW + minutes_to_ms(60.0));
        let guard = with_tokens_expiration_access(Screen, h.options(), h.context());

        assert_eq!(guard.on_attach().await, GuardOutcome::Valid);
        h.clock.advance(std::time::Duration::from_secs(3_600));
        assert_eq!(guard.on_focus().await, GuardOutcome::Expired);
        assert_eq!(guard.on_focus().await, GuardOutcome::Expired);
        assert_eq!(h.counts(), (2, 0, 2));
    }

    #[tokio::test]
    async fn failing_expired_callback_still_logs_out() {
        let h = Harness::new();
        h.expire_at(NOW);
        let options = GuardOptions::<String>::new()
            .on_token_expired(callback(|| async { Err(anyhow::anyhow!("analytics offline")) }));
        let guard = with_tokens_expiration_access(Screen, options, h.context());

        assert_eq!(guard.on_attach().await, GuardOutcome::Expired);
        assert_eq!(h.logout.calls(), 1);
        assert!(!guard.is_loading());
    }

    /// Validates loading rendering and latch de-duplication.
    ///
    /// Assertions:
    /// - Ensures the loading view renders while the expired callback runs.
    /// - Ensures a second trigger during that window does not re-fire.
    #[tokio::test]
    async fn loading_view_and_latch_during_expired_callback() {
        let h = Harness::new();
        h.expire_at(NOW);
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let options = GuardOptions::new()
            .on_token_expired(callback({
                let started = started.clone();
                let release = release.clone();
                move || {
                    let started = started.clone();
                    let release = release.clone();
                    async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(())
                    }
                }
            }))
            .render_loading_component(|| "loading".to_string());
        let guard = Arc::new(with_tokens_expiration_access(Screen, options, h.context()));

        let first = tokio::spawn({
            let guard = guard.clone();
            async move { guard.on_attach().await }
        });
        started.notified().await;

        assert!(guard.is_loading());
        assert_eq!(guard.render(&"home"), Some("loading".to_string()));
        assert_eq!(guard.on_focus().await, GuardOutcome::AlreadyRunning);

        release.notify_one();
        assert_eq!(first.await.unwrap(), GuardOutcome::Expired);
        assert_eq!(h.logout.calls(), 1);
        assert_eq!(guard.render(&"home"), Some("screen:home".to_string()));
    }

    /// Validates an access token expiring exactly now with default thresholds.
    ///
    /// Assertions:
    /// - Ensures `on_token_expired` fires once followed by one logout.
    /// - Ensures `on_token_near_expiration` is not called.
    #[tokio::test]
    async fn expiring_now_fires_expired_then_logout() {
        let h = Harness::new();
        h.expire_at(NOW);
        let guard = with_tokens_expiration_access(Screen, h.options(), h.context());

        assert_eq!(guard.on_attach().await, GuardOutcome::Expired);
        assert_eq!(h.counts(), (1, 0, 1));
    }

    #[tokio::test]
    async fn near_window_fires_near_only() {
        let h = Harness::new();
        h.expire_at(NOW + minutes_to_ms(17.5));
        let guard = with_tokens_expiration_access(
            Screen,
            h.options().expired_minutes(5.0).near_expiration_minutes(30.0),
            h.context(),
        );

        assert_eq!(guard.on_attach().await, GuardOutcome::NearExpiration);
        assert_eq!(h.counts(), (0, 1, 0));
    }

    #[tokio::test]
    async fn outside_near_window_fires_nothing() {
        let h = Harness::new();
        h.expire_at(NOW + minutes_to_ms(35.0));
        let guard = with_tokens_expiration_access(
            Screen,
            h.options().expired_minutes(5.0).near_expiration_minutes(30.0),
            h.context(),
        );

        assert_eq!(guard.on_attach().await, GuardOutcome::Valid);
        assert_eq!(h.counts(), (0, 0, 0));
    }

    /// Validates behavior when the cache cannot be read.
    ///
    /// Assertions:
    /// - Ensures no callback or logout runs.
    /// - Ensures the wrapped component still renders.
    #[tokio::test]
    async fn cache_failure_still_renders_component() {
        let h = Harness::new();
        h.expire_at(NOW);
        h.kv.fail_reads(true);
        let guard = with_tokens_expiration_access(Screen, h.options(), h.context());

        assert_eq!(guard.on_attach().await, GuardOutcome::Failed);
        assert_eq!(h.counts(), (0, 0, 0));
        assert_eq!(guard.render(&"home"), Some("screen:home".to_string()));
    }

    #[test]
    fn options_from_config_copy_thresholds() {
        let config = GuardConfig {
            minutes_to_consider_token_as_expired: 5.0,
            minutes_to_consider_token_as_near_expiration: Some(30.0),
            ..GuardConfig::default()
        };
        let options = GuardOptions::<String>::from_config(&config);
        assert_eq!(options.minutes_to_consider_token_as_expired, 5.0);
        assert_eq!(options.minutes_to_consider_token_as_near_expiration, Some(30.0));
        assert!(options.on_token_expired.is_none());
    }

    #[tokio::test]
    async fn missing_expiration_does_nothing() {
        let h = Harness::new();
        let guard = with_tokens_expiration_access(Screen, h.options(), h.context());
        assert_eq!(guard.on_attach().await, GuardOutcome::NoSession);
        assert_eq!(h.counts(), (0, 0, 0));
        assert!(!guard.is_checking());
    }
}
