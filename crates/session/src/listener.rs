use crate::error::SessionError;
use crate::profile::resolve_profile;
use crate::state::SessionState;
use backend_client::{AuthEvent, AuthProvider, Backend, Session};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Keeps a `SessionState` current by listening to the platform's auth events.
pub struct SessionListener {
    auth: Arc<dyn AuthProvider>,
    backend: Arc<dyn Backend>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionListener {
    /// Starts listening and returns the handle that owns the subscription.
    ///
    /// The state starts as `Loading`, then settles once the current session (if any)
    /// and its profile are resolved. Events that arrive meanwhile are queued, not lost.
    pub fn start(auth: Arc<dyn AuthProvider>, backend: Arc<dyn Backend>) -> SessionHandle {
        let (state_tx, state_rx) = watch::channel(SessionState::Loading);
        // Subscribe before the initial query so no change slips between the two.
        let events = auth.subscribe();
        let listener = Self { auth, backend, state_tx };
        let task = tokio::spawn(listener.run(events));
        SessionHandle { state: state_rx, task: Some(task) }
    }

    async fn run(self, mut events: broadcast::Receiver<AuthEvent>) {
        self.resync().await;

        loop {
            match events.recv().await {
                Ok(event) => self.apply(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Session listener lagged, skipped {} auth events. Resynchronizing.", n);
                    self.resync().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Auth event channel closed. Session listener shutting down.");
                    break;
                }
            }
        }
    }

    async fn apply(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => self.publish(SessionState::SignedOut),
            AuthEvent::TokenRefreshed(session) if self.is_current_user(&session) => {
                tracing::debug!(user_id = %session.user.id, "Token refreshed.");
            }
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) | AuthEvent::UserUpdated(session) => {
                self.sign_in(session).await
            }
        }
    }

    async fn resync(&self) {
        match self.auth.current_session().await {
            Ok(Some(session)) => self.sign_in(session).await,
            Ok(None) => self.publish(SessionState::SignedOut),
            Err(e) => {
                tracing::error!(error = %e, "Failed to query the current session.");
                self.publish(SessionState::SignedOut);
            }
        }
    }

    async fn sign_in(&self, session: Session) {
        match resolve_profile(self.backend.as_ref(), &session.user).await {
            Ok(profile) => self.publish(SessionState::SignedIn { user: session.user, profile }),
            Err(e) => {
                tracing::error!(user_id = %session.user.id, error = %e, "Failed to resolve profile.");
                self.publish(SessionState::SignedOut);
            }
        }
    }

    fn is_current_user(&self, session: &Session) -> bool {
        matches!(&*self.state_tx.borrow(), SessionState::SignedIn { user, .. } if user.id == session.user.id)
    }

    fn publish(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

/// Owns the listener task. Dropping the handle stops it.
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// A snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Waits until the initial session query has settled.
    pub async fn ready(&mut self) -> Result<SessionState, SessionError> {
        let state = self
            .state
            .wait_for(|s| !s.is_loading())
            .await
            .map_err(|_| SessionError::ListenerStopped)?;
        Ok(state.clone())
    }

    /// Stops the listener and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Session listener task failed.");
                }
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
