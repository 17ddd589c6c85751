//! The process-wide authenticated session.
//!
//! `SessionManager` owns the session state, the persisted tokens and the
//! shared API client's auth configuration. It is the only writer of
//! `SessionStorage`.
//!
//! Phases: `Uninitialized -> Checking -> {Authenticated, Anonymous}`, with
//! `Authenticated -> Anonymous` on logout, failed verification or an
//! exhausted refresh budget. All three end in the same teardown.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest, AuthHandler};
use crate::models::{Role, User};

use super::error::SessionError;
use super::guard::{GuardDecision, RouteGuard, DEFAULT_LOGIN_PATH};
use super::navigation::Navigator;
use super::storage::SessionStorage;

/// Refresh attempts allowed between two logins/logouts
pub const MAX_REFRESH_ATTEMPTS: u32 = 3;

pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const VERIFY_PATH: &str = "/auth/verify/";
const REFRESH_PATH: &str = "/auth/token/refresh/";
const LOGOUT_PATH: &str = "/auth/logout/";

const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionPhase {
    Uninitialized,
    Checking,
    Authenticated,
    Anonymous,
}

/// Read-only view of the session, handed to route guards and views.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub auth_checked: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Navigation targets used by the session manager
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub landing_path: String,
    pub login_path: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            landing_path: DEFAULT_LANDING_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    user: Option<User>,
    access_token: Option<String>,
    is_loading: bool,
    auth_checked: bool,
    error: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            user: None,
            access_token: None,
            is_loading: false,
            auth_checked: false,
            error: None,
        }
    }

    fn authenticate(&mut self, user: User, access_token: String) {
        self.phase = SessionPhase::Authenticated;
        self.user = Some(user);
        self.access_token = Some(access_token);
        self.is_loading = false;
        self.auth_checked = true;
        self.error = None;
    }

    fn clear(&mut self, error: Option<String>) {
        self.phase = SessionPhase::Anonymous;
        self.user = None;
        self.access_token = None;
        self.is_loading = false;
        self.auth_checked = true;
        self.error = error;
    }
}

struct Inner {
    client: ApiClient,
    storage: SessionStorage,
    navigator: Arc<dyn Navigator>,
    options: SessionOptions,
    state: RwLock<SessionState>,
    retry_count: AtomicU32,
    /// Bumped whenever a session begins or ends. A refresh started under an
    /// older epoch must not install its token.
    epoch: AtomicU64,
    initialized: AtomicBool,
    alive: AtomicBool,
    return_to: Mutex<Option<String>>,
}

/// Handle to the session. Clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create the session and register it with `client` as token getter and
    /// 401 handler.
    pub fn new(
        client: ApiClient,
        storage: SessionStorage,
        navigator: Arc<dyn Navigator>,
        options: SessionOptions,
    ) -> Self {
        let inner = Arc::new(Inner {
            client,
            storage,
            navigator,
            options,
            state: RwLock::new(SessionState::new()),
            retry_count: AtomicU32::new(0),
            epoch: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            return_to: Mutex::new(None),
        });

        inner.client.register_auth_handler(Arc::new(RefreshHook {
            inner: Arc::downgrade(&inner),
        }));

        Self { inner }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    /// Refresh attempts consumed since the last login/logout
    pub fn retry_count(&self) -> u32 {
        self.inner.retry_count.load(Ordering::SeqCst)
    }

    pub fn clear_error(&self) {
        self.inner.update(|s| s.error = None);
    }

    /// Restore the persisted session, verifying it with the backend.
    /// Only the first call does anything, and only if no login has settled
    /// the session yet; otherwise the current snapshot is returned.
    pub async fn initialize(&self) -> SessionSnapshot {
        let inner = &self.inner;
        let already_started = inner.initialized.swap(true, Ordering::SeqCst);
        if already_started || inner.snapshot().auth_checked {
            return inner.snapshot();
        }
        inner.update(|s| s.phase = SessionPhase::Checking);

        let stored = match inner.storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                None
            }
        };

        let Some(stored) = stored else {
            debug!("No persisted session");
            inner.update(|s| s.clear(None));
            return inner.snapshot();
        };

        inner.update(|s| s.is_loading = true);
        inner.client.set_token(stored.access_token.clone());

        let verify = ApiRequest::post(VERIFY_PATH).json(&json!({ "token": stored.access_token }));
        let verified = match verify {
            Ok(request) => inner.client.execute(request).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match verified {
            Ok(()) => {
                let user = stored.user.with_initials();
                info!(user_id = user.id, role = %user.role, "Session restored");
                inner.update(|s| s.authenticate(user, stored.access_token));
            }
            Err(e) => {
                warn!(error = %e, "Persisted session failed verification");
                inner.logout(None).await;
            }
        }

        inner.snapshot()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        self.inner
            .authenticate(LOGIN_PATH, credentials, true, "Login failed")
            .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, SessionError> {
        self.inner
            .authenticate(REGISTER_PATH, registration, false, "Registration failed")
            .await
    }

    /// End the session. The server-side invalidation is best effort; local
    /// state is always cleared.
    pub async fn logout(&self) {
        self.inner.logout(None).await;
    }

    /// Evaluate a route guard against the current session. A redirect to
    /// the login view remembers `path` as the post-login destination.
    pub fn authorize(&self, guard: &RouteGuard, path: &str) -> GuardDecision {
        let decision = guard.evaluate(&self.snapshot(), path);
        if let GuardDecision::Redirect { ref to, from: Some(ref from) } = decision {
            if *to == self.inner.options.login_path {
                *self
                    .inner
                    .return_to
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(from.clone());
            }
        }
        decision
    }

    /// Stop applying state updates and navigations. In-flight operations
    /// still complete, but their results are dropped.
    pub fn shutdown(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        debug!("Session manager shut down");
    }
}

impl Inner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.read().unwrap_or_else(|e| e.into_inner());
        SessionSnapshot {
            phase: s.phase,
            user: s.user.clone(),
            access_token: s.access_token.clone(),
            is_authenticated: s.user.is_some(),
            is_loading: s.is_loading,
            auth_checked: s.auth_checked,
            error: s.error.clone(),
        }
    }

    /// Apply a state change unless the manager has been shut down
    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        if !self.is_alive() {
            return;
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    fn navigate(&self, path: &str) {
        if self.is_alive() {
            self.navigator.navigate(path);
        }
    }

    async fn authenticate<B: Serialize + Sync>(
        &self,
        path: &str,
        payload: &B,
        credentials_checked: bool,
        fallback: &str,
    ) -> Result<User, SessionError> {
        if !self.is_alive() {
            return Err(SessionError::ShutDown);
        }
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        match self.client.post::<AuthResponse, _>(path, payload).await {
            Ok(response) => Ok(self.complete_authentication(response)),
            Err(e) => {
                warn!(path, error = %e, "Authentication failed");
                let err = SessionError::from_auth_failure(e, credentials_checked);
                let message = err.user_message(fallback);
                self.update(|s| {
                    s.is_loading = false;
                    s.error = Some(message);
                });
                Err(err)
            }
        }
    }

    fn complete_authentication(&self, response: AuthResponse) -> User {
        let user = response.user.with_initials();

        if let Err(e) = self
            .storage
            .persist(&response.access, response.refresh.as_deref(), &user)
        {
            warn!(error = %e, "Failed to persist session");
        }
        self.client.set_token(response.access.clone());
        self.retry_count.store(0, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.update(|s| s.authenticate(user.clone(), response.access));

        info!(user_id = user.id, role = %user.role, "Login successful");

        let destination = self
            .return_to
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_else(|| self.options.landing_path.clone());
        self.navigate(&destination);
        user
    }

    /// Best-effort server logout, then local teardown. `error` is left on
    /// the session for the login view to display.
    async fn logout(&self, error: Option<String>) {
        self.update(|s| s.is_loading = true);

        match self.storage.refresh_token() {
            Ok(Some(refresh)) => {
                let request = ApiRequest::post(LOGOUT_PATH).json(&json!({ "refresh": refresh }));
                let result = match request {
                    Ok(request) => self.client.execute(request).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    warn!(error = %e, "Logout API error");
                }
            }
            Ok(None) => debug!("No refresh token to invalidate"),
            Err(e) => warn!(error = %e, "Failed to read refresh token"),
        }

        self.teardown(error);
    }

    fn teardown(&self, error: Option<String>) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.client.clear_token();
        self.retry_count.store(0, Ordering::SeqCst);
        self.update(|s| s.clear(error));
        info!("Session ended");
        self.navigate(&self.options.login_path);
    }

    async fn expire(&self) {
        self.logout(Some(SESSION_EXPIRED_MESSAGE.to_string())).await;
    }

    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        if !self.is_alive() {
            return Err(ApiError::Unauthorized);
        }

        let attempt = match self.retry_count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n < MAX_REFRESH_ATTEMPTS).then_some(n + 1)
        }) {
            Ok(previous) => previous + 1,
            Err(_) => {
                warn!("Refresh attempts exhausted");
                self.expire().await;
                return Err(ApiError::SessionExpired);
            }
        };

        let refresh = match self.storage.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!(attempt, "No refresh token available");
                self.expire().await;
                return Err(ApiError::SessionExpired);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Failed to read refresh token");
                self.expire().await;
                return Err(ApiError::SessionExpired);
            }
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self
            .client
            .post::<RefreshResponse, _>(REFRESH_PATH, &json!({ "refresh": refresh }))
            .await;

        if self.epoch.load(Ordering::SeqCst) != epoch || !self.is_alive() {
            debug!(attempt, "Session changed during refresh, discarding result");
            return Err(ApiError::SessionExpired);
        }

        match result {
            Ok(response) => {
                if let Err(e) = self.storage.set_access_token(&response.access) {
                    warn!(error = %e, "Failed to persist refreshed token");
                }
                self.client.set_token(response.access.clone());
                self.update(|s| {
                    if s.user.is_some() {
                        s.access_token = Some(response.access.clone());
                    }
                });
                info!(attempt, "Access token refreshed");
                Ok(response.access)
            }
            Err(e) => {
                warn!(attempt, error = %e, "Token refresh failed");
                self.expire().await;
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn retry_rejected(&self) -> ApiError {
        if self.retry_count.load(Ordering::SeqCst) >= MAX_REFRESH_ATTEMPTS {
            self.expire().await;
            ApiError::SessionExpired
        } else {
            ApiError::Unauthorized
        }
    }
}

/// The session's side of the client's auth hooks. Holds a weak reference so
/// the client (owned by the session) does not keep the session alive.
struct RefreshHook {
    inner: Weak<Inner>,
}

#[async_trait]
impl AuthHandler for RefreshHook {
    fn access_token(&self) -> Option<String> {
        let inner = self.inner.upgrade()?;
        inner.storage.access_token().ok().flatten()
    }

    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        match self.inner.upgrade() {
            Some(inner) => inner.refresh_access_token().await,
            None => Err(ApiError::Unauthorized),
        }
    }

    async fn retry_rejected(&self) -> ApiError {
        match self.inner.upgrade() {
            Some(inner) => inner.retry_rejected().await,
            None => ApiError::Unauthorized,
        }
    }
}
