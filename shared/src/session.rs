//! Authentication session state.
//!
//! One `SessionStore` per front-end, shared as `Arc<SessionStore>`. It owns the
//! signed-in user, the loading flag shown while a stored session is being
//! restored and the last error message of a session action.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::client::auth::{LoginResponse, RegisterRequest};
use crate::client::{ApiClient, SessionEvent};
use crate::error::AuthError;
use crate::models::User;

pub const LOGIN_FAILED: &str = "Login failed";
pub const TWO_FACTOR_FAILED: &str = "2FA verification failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    /// State before `init` has run.
    pub fn initial() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Credentials accepted but a second factor is needed. Nothing was stored.
    TwoFactorRequired { user_id: i64 },
    Authenticated(User),
}

pub struct SessionStore {
    client: Arc<ApiClient>,
    state: RwLock<SessionSnapshot>,
    last_activity: Mutex<Instant>,
}

impl SessionStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(SessionSnapshot::initial()),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) {
        match self.state.write() {
            Ok(mut state) => apply(&mut state),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }

    /// Record `err` as the current error and hand it back.
    fn fail(&self, err: AuthError) -> AuthError {
        let message = err.message.clone();
        self.update(|state| state.error = Some(message));
        err
    }

    /// Restore a stored session. Never retries; a rejected token is discarded.
    pub async fn init(&self) {
        if self.client.tokens().access_token().is_none() {
            self.update(|state| state.is_loading = false);
            return;
        }

        match self.client.auth().me().await {
            Ok(user) => {
                info!("Restored session for {}", user.email);
                self.update(|state| {
                    state.user = Some(user);
                    state.is_authenticated = true;
                    state.is_loading = false;
                });
                self.record_activity();
            }
            Err(e) => {
                warn!("Stored session rejected: {}", e);
                if let Err(e) = self.client.tokens().clear() {
                    error!("Failed to clear stored tokens: {}", e);
                }
                self.update(|state| {
                    state.user = None;
                    state.is_authenticated = false;
                    state.is_loading = false;
                });
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        self.clear_error();

        let response = self
            .client
            .auth()
            .login(email, password)
            .await
            .map_err(|e| self.fail(AuthError::from_api(&e, LOGIN_FAILED)))?;

        if response.requires_2fa {
            return match response.user_id {
                Some(user_id) => {
                    info!("Second factor required for user {}", user_id);
                    Ok(LoginOutcome::TwoFactorRequired { user_id })
                }
                None => Err(self.fail(AuthError::new(LOGIN_FAILED))),
            };
        }

        self.establish(response, LOGIN_FAILED)
            .map(LoginOutcome::Authenticated)
    }

    pub async fn login_2fa(&self, user_id: i64, code: &str) -> Result<User, AuthError> {
        self.clear_error();

        let response = self
            .client
            .auth()
            .login_2fa(user_id, code)
            .await
            .map_err(|e| self.fail(AuthError::from_api(&e, TWO_FACTOR_FAILED)))?;

        self.establish(response, TWO_FACTOR_FAILED)
    }

    /// Store the issued session. Either both tokens and the user land, or nothing does.
    fn establish(&self, response: LoginResponse, fallback: &str) -> Result<User, AuthError> {
        let LoginResponse {
            access_token: Some(access),
            refresh_token: Some(refresh),
            user: Some(user),
            ..
        } = response
        else {
            warn!("Login response is missing tokens or user");
            return Err(self.fail(AuthError::new(fallback)));
        };

        let tokens = self.client.tokens();
        if let Err(e) = tokens.store_session(&access, &refresh) {
            error!("Failed to persist session tokens: {}", e);
            if let Err(e) = tokens.clear() {
                error!("Failed to clear partial session: {}", e);
            }
            return Err(self.fail(AuthError::new(fallback)));
        }

        info!("Logged in as {} ({})", user.email, user.role.as_str());
        self.update(|state| {
            state.user = Some(user.clone());
            state.is_authenticated = true;
            state.is_loading = false;
        });
        self.record_activity();
        Ok(user)
    }

    /// Create an account. Does not sign the new user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        self.clear_error();
        self.client
            .auth()
            .register(request)
            .await
            .map(|response| response.user)
            .map_err(|e| self.fail(AuthError::from_api(&e, REGISTRATION_FAILED)))
    }

    /// Revoke the session on the server if possible, then forget it locally regardless.
    pub async fn logout(&self) {
        if self.client.tokens().access_token().is_some() {
            if let Err(e) = self.client.auth().logout().await {
                warn!("Logout request failed: {}", e);
            }
        }
        if let Err(e) = self.client.tokens().clear() {
            error!("Failed to clear stored tokens: {}", e);
        }
        self.reset();
        info!("Logged out");
    }

    fn reset(&self) {
        self.update(|state| {
            state.user = None;
            state.is_authenticated = false;
            state.is_loading = false;
        });
    }

    pub fn update_user(&self, user: User) {
        self.update(|state| state.user = Some(user));
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    pub fn record_activity(&self) {
        let now = Instant::now();
        match self.last_activity.lock() {
            Ok(mut last) => *last = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    fn last_activity(&self) -> Instant {
        match self.last_activity.lock() {
            Ok(last) => *last,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Log the user out once `timeout` passes without `record_activity`.
    /// The task ends when the store is dropped.
    pub fn spawn_inactivity_watchdog(self: &Arc<Self>, timeout: Duration) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let Some(store) = session.upgrade() else {
                    return;
                };
                let seen = store.last_activity();
                drop(store);

                tokio::time::sleep_until(seen + timeout).await;

                let Some(store) = session.upgrade() else {
                    return;
                };
                if store.last_activity() != seen {
                    continue;
                }
                if store.is_authenticated() {
                    info!(
                        "User inactive for {} minutes, logging out",
                        timeout.as_secs() / 60
                    );
                    store.logout().await;
                }
                store.record_activity();
            }
        })
    }

    /// Drop to the signed-out state when the client reports a rejected refresh.
    pub fn spawn_expiry_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.client.subscribe();
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Expired { redirect }) => {
                        let Some(store) = session.upgrade() else {
                            return;
                        };
                        warn!("Session expired, continue at {}", redirect);
                        store.reset();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} session events", skipped);
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::Role;
    use crate::storage::MemoryTokenStore;

    // Nothing listens on the discard port, so any request fails fast.
    fn offline_session() -> Arc<SessionStore> {
        let client = ApiClient::new(
            &Config::for_base_url("http://127.0.0.1:9/api/v1"),
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();
        Arc::new(SessionStore::new(Arc::new(client)))
    }

    fn demo_user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 1, "email": "trader@example.com", "first_name": "Tia", "last_name": "Trader",
            "role": "trader"
        }))
        .unwrap()
    }

    fn sign_in(session: &SessionStore) {
        session.update(|state| {
            state.user = Some(demo_user());
            state.is_authenticated = true;
            state.is_loading = false;
        });
    }

    #[tokio::test]
    async fn init_without_token_just_stops_loading() {
        let session = offline_session();
        assert!(session.snapshot().is_loading);

        session.init().await;

        let snapshot = session.snapshot();
        assert!(!snapshot.is_loading);
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn init_with_unreachable_server_discards_tokens() {
        let session = offline_session();
        session.client().tokens().store_session("a", "r").unwrap();

        session.init().await;

        assert!(!session.snapshot().is_loading);
        assert!(!session.is_authenticated());
        assert!(session.client().tokens().access_token().is_none());
        assert!(session.client().tokens().refresh_token().is_none());
    }

    #[tokio::test]
    async fn failed_login_records_default_message() {
        let session = offline_session();
        let err = session.login("x@example.com", "pw").await.unwrap_err();
        assert_eq!(err.message, LOGIN_FAILED);
        assert_eq!(session.snapshot().error.as_deref(), Some(LOGIN_FAILED));

        session.clear_error();
        assert!(session.snapshot().error.is_none());
    }

    #[test]
    fn incomplete_login_response_stores_nothing() {
        let session = offline_session();
        let response = LoginResponse {
            access_token: Some("a".into()),
            refresh_token: None,
            user: Some(demo_user()),
            ..Default::default()
        };

        let err = session.establish(response, LOGIN_FAILED).unwrap_err();
        assert_eq!(err.message, LOGIN_FAILED);
        assert!(session.client().tokens().access_token().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn complete_login_response_signs_in() {
        let session = offline_session();
        let response = LoginResponse {
            access_token: Some("a".into()),
            refresh_token: Some("r".into()),
            user: Some(demo_user()),
            ..Default::default()
        };

        let user = session.establish(response, LOGIN_FAILED).unwrap();
        assert_eq!(user.role, Role::Trader);
        assert!(session.is_authenticated());
        assert_eq!(session.client().tokens().refresh_token().as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn logout_clears_state_even_when_server_is_down() {
        let session = offline_session();
        session.client().tokens().store_session("a", "r").unwrap();
        sign_in(&session);

        session.logout().await;

        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.client().tokens().access_token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_logs_out_after_inactivity() {
        let session = offline_session();
        sign_in(&session);
        session.record_activity();
        let watchdog = session.spawn_inactivity_watchdog(Duration::from_secs(15 * 60));

        tokio::time::sleep(Duration::from_secs(14 * 60)).await;
        assert!(session.is_authenticated());
        session.record_activity();

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert!(session.is_authenticated());

        tokio::time::sleep(Duration::from_secs(6 * 60)).await;
        assert!(!session.is_authenticated());

        watchdog.abort();
    }

    #[tokio::test]
    async fn expiry_event_signs_out() {
        let session = offline_session();
        sign_in(&session);
        let listener = session.spawn_expiry_listener();

        session.client().notify(SessionEvent::Expired { redirect: "/login" });
        for _ in 0..50 {
            if !session.is_authenticated() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!session.is_authenticated());
        listener.abort();
    }
}
