//! Session controller
//!
//! Owns the session lifecycle for one attached observer tree:
//! `InitialLoading -> Validating -> {LoggedIn, LoggedOut, Error}`, plus
//! `LoggedIn -> LoggingOut -> LoggedOut` on explicit logout. When a logout
//! flips `is_logged` from true to false the controller validates again on a
//! spawned task, which starts a fresh authorization when the cache is empty.
//! `handle_logout` returns once the logged-out state is published; it does
//! not wait for that new authorization.
//!
//! Every state change is published as one [`SessionSnapshot`] through a
//! `tokio::sync::watch` channel. After [`SessionController::detach`], results
//! of calls still in flight are discarded instead of published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use authsession_domain::constants::{INVALID_ID_TOKEN_MESSAGE, LOGOUT_ERROR_MESSAGE};
use authsession_domain::{SessionPhase, SessionSnapshot, SessionState};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::claims::ClaimsDecoder;
use crate::report::report;
use crate::store::TokenStore;

/// Stateful controller bound to one observer tree
pub struct SessionController {
    store: Arc<TokenStore>,
    decoder: ClaimsDecoder,
    state: watch::Sender<SessionSnapshot>,
    alive: AtomicBool,
}

impl SessionController {
    /// Controller over `store`, attached and in `InitialLoading`.
    pub fn new(store: Arc<TokenStore>) -> Self {
        let decoder = store.decoder().clone();
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self { store, decoder, state, alive: AtomicBool::new(true) }
    }

    /// Token store backing this controller.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// New receiver observing every subsequent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// False after [`SessionController::detach`].
    pub fn is_attached(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Validate the cached session and authorize when it is not logged in.
    pub async fn attach(&self) {
        self.alive.store(true, Ordering::SeqCst);
        info!("session controller attached");
        self.revalidate().await;
    }

    /// Stop publishing. In-flight calls complete but their results are dropped.
    pub fn detach(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("session controller detached");
        }
    }

    /// Validate, then authorize if the cache holds no usable session.
    pub async fn revalidate(&self) {
        if !self.is_attached() {
            return;
        }
        self.mark_validating();
        self.validate_and_authorize().await;
    }

    fn mark_validating(&self) {
        self.publish(|snapshot| {
            snapshot.loading = true;
            snapshot.phase = SessionPhase::Validating;
        });
    }

    /// Revalidation after a logged-in to logged-out flip. `Validating` is
    /// published before this returns; the validation itself runs on its own
    /// task.
    fn spawn_revalidation(self: &Arc<Self>) {
        self.mark_validating();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if controller.is_attached() {
                controller.validate_and_authorize().await;
            }
        });
    }

    async fn validate_and_authorize(&self) {
        let state = self.store.validate().await;
        if !self.is_attached() {
            debug!("discarding validation result after detach");
            return;
        }

        if state.is_logged() {
            self.apply_session(state);
        } else {
            self.handle_authorize().await;
        }
    }

    /// Run the authorization flow and publish its outcome.
    pub async fn handle_authorize(&self) {
        let outcome = self.store.authorize().await;
        if !self.is_attached() {
            debug!("discarding authorization result after detach");
            return;
        }

        match outcome {
            Ok(state) => {
                self.apply_session(state);
            }
            Err(err) => {
                report(&err, "authorize");
                let message = err.user_message().to_string();
                self.publish(|snapshot| {
                    snapshot.error = Some(message);
                    snapshot.loading = false;
                    snapshot.phase = SessionPhase::Error;
                });
            }
        }
    }

    /// Log out through the store and reset to the unauthenticated default.
    ///
    /// On failure the previous session is kept and `"Error in logout"` is
    /// published. A successful logout of a logged-in session schedules
    /// revalidation without awaiting it.
    pub async fn handle_logout(self: &Arc<Self>) {
        if !self.is_attached() {
            return;
        }
        self.publish(|snapshot| {
            snapshot.loading = true;
            snapshot.phase = SessionPhase::LoggingOut;
        });

        let outcome = self.store.logout().await;
        if !self.is_attached() {
            debug!("discarding logout result after detach");
            return;
        }

        match outcome {
            Ok(()) => {
                if self.apply_session(SessionState::logged_out()) {
                    self.spawn_revalidation();
                }
            }
            Err(err) => {
                report(&err, "logout");
                self.publish(|snapshot| {
                    snapshot.error = Some(LOGOUT_ERROR_MESSAGE.to_string());
                    snapshot.loading = false;
                    snapshot.phase = SessionPhase::Error;
                });
            }
        }
    }

    /// Publish `next` as the current session. Returns true when this flipped
    /// `is_logged` from true to false.
    fn apply_session(&self, next: SessionState) -> bool {
        let previous = self.state.borrow();
        let was_logged = previous.is_logged();
        let id_token_changed = previous.session.id_token() != next.id_token();
        drop(previous);

        let mut decode_error = None;
        let claims = if id_token_changed {
            match next.id_token().map(|token| self.decoder.decode(token)).transpose() {
                Ok(claims) => Some(claims.flatten()),
                Err(err) => {
                    report(&err, "decode identity token");
                    decode_error = Some(INVALID_ID_TOKEN_MESSAGE.to_string());
                    Some(None)
                }
            }
        } else {
            None
        };

        let is_logged = next.is_logged();
        let next_error = next.error().map(str::to_string);
        self.publish(|snapshot| {
            // Without a re-decode the previous decode failure still applies.
            let kept_decode_error = snapshot
                .error
                .take()
                .filter(|message| claims.is_none() && message == INVALID_ID_TOKEN_MESSAGE);
            snapshot.error = decode_error.or(next_error).or(kept_decode_error);
            snapshot.session = next;
            if let Some(claims) = claims {
                snapshot.user_claims = claims;
            }
            snapshot.loading = false;
            snapshot.phase =
                if is_logged { SessionPhase::LoggedIn } else { SessionPhase::LoggedOut };
        });

        debug!(is_logged, id_token_changed, "session state applied");
        was_logged && !is_logged
    }

    fn publish(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        self.state.send_modify(update);
    }
}
