//! Session context: one controller, many observers
//!
//! A [`SessionProvider`] owns exactly one [`SessionController`] and hands out
//! cheap [`SessionHandle`]s. Every handle reads the same published snapshot
//! and wakes on the same changes.

use std::sync::Arc;

use async_trait::async_trait;
use authsession_domain::{SessionSnapshot, SessionState, UserClaims};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::controller::SessionController;
use crate::guard::{GuardContext, LogoutAction};

/// Owner of the controller for one observer tree. Dropping it detaches.
pub struct SessionProvider {
    controller: Arc<SessionController>,
}

impl SessionProvider {
    /// Own `controller`; it is detached when the provider drops.
    pub fn new(controller: SessionController) -> Self {
        Self { controller: Arc::new(controller) }
    }

    /// Attach the controller and wait for the first validation to settle.
    pub async fn attach(&self) {
        self.controller.attach().await;
    }

    /// Attach on a background task.
    pub fn spawn_attach(&self) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move { controller.attach().await })
    }

    /// Subscribed handle for consumers
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            controller: Arc::clone(&self.controller),
            receiver: self.controller.subscribe(),
        }
    }

    /// Underlying controller
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.controller.detach();
    }
}

/// Observer-side accessor to the shared session.
#[derive(Clone)]
pub struct SessionHandle {
    controller: Arc<SessionController>,
    receiver: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Current snapshot, marking it as seen.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Current snapshot without touching the seen marker.
    pub fn peek(&self) -> SessionSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot. Returns `false` once the
    /// controller is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until `predicate` holds for the published snapshot.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> Option<SessionSnapshot> {
        self.receiver.wait_for(predicate).await.ok().map(|snapshot| snapshot.clone())
    }

    /// Latest session state
    pub fn session(&self) -> SessionState {
        self.receiver.borrow().session.clone()
    }

    /// Claims from the current identity token
    pub fn user_claims(&self) -> Option<UserClaims> {
        self.receiver.borrow().user_claims.clone()
    }

    /// Whether the latest snapshot is logged in
    pub fn is_logged(&self) -> bool {
        self.receiver.borrow().is_logged()
    }

    /// Whether a validation or login is in flight
    pub fn loading(&self) -> bool {
        self.receiver.borrow().loading
    }

    /// Message from the last failed operation
    pub fn error(&self) -> Option<String> {
        self.receiver.borrow().error.clone()
    }

    /// Log out; follow-up validation runs in the background.
    pub async fn handle_logout(&self) {
        self.controller.handle_logout().await;
    }

    /// Run the interactive login
    pub async fn handle_authorize(&self) {
        self.controller.handle_authorize().await;
    }

    /// Dependencies for expiration guards bound to this session.
    pub fn guard_context(&self) -> GuardContext {
        let store = self.controller.store();
        GuardContext::new(store.cache(), Arc::new(self.clone()), store.clock())
    }
}

#[async_trait]
impl LogoutAction for SessionHandle {
    async fn logout(&self) {
        self.handle_logout().await;
    }
}
