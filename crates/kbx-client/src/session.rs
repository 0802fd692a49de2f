//! Session lifecycle: restore, login, refresh, logout.
//!
//! The [`SessionContext`] is the single owned copy of the session, shared
//! between the HTTP client (which reads the token and clears on auth
//! failures) and the [`SessionManager`] (which drives the state machine).
//! There is no module-level global.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::types::{Credentials, ProfileUpdate, Registration, User};
use crate::api::{auth, users};
use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult, ErrorCategory};
use crate::store::SessionStore;

/// A refresh is scheduled when the token expires within this window.
pub const REFRESH_THRESHOLD_SECS: u64 = 300;

/// Lifecycle states of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No credentials held.
    #[default]
    Anonymous,
    /// A persisted token is being validated at startup.
    Restoring,
    /// A token is held and the profile has been confirmed.
    Authenticated,
    /// The token is being exchanged for a fresh one.
    Refreshing,
}

/// The authenticated-identity state of this client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    /// A session is authenticated exactly when it holds a token.
    pub fn authenticated(&self) -> bool {
        self.token.is_some()
    }
}

struct SessionInner {
    session: Session,
    state: SessionState,
    /// Monotonic ticket for session-mutating calls. A completing call
    /// applies its result only while its ticket is still the newest issued,
    /// so a stale refresh cannot clobber a newer login.
    issued: u64,
}

/// Shared session state handed to every collaborator.
pub struct SessionContext {
    store: SessionStore,
    inner: Mutex<SessionInner>,
}

impl SessionContext {
    /// Creates an empty (Anonymous) context over the given store.
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            inner: Mutex::new(SessionInner {
                session: Session::default(),
                state: SessionState::Anonymous,
                issued: 0,
            }),
        }
    }

    /// Returns the persistent store backing this context.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Returns a copy of the in-memory session.
    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().session.authenticated()
    }

    /// Clears the in-memory session and the persisted record, in that
    /// order, and counts as the newest mutation so in-flight completions
    /// are discarded. Clearing an already-empty session is a no-op.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.issued += 1;
            inner.session = Session::default();
            inner.state = SessionState::Anonymous;
        }
        self.store.clear_session();
    }

    /// Issues a new mutation ticket, applying `prepare` under the same
    /// lock.
    fn issue_with(&self, prepare: impl FnOnce(&mut SessionInner)) -> u64 {
        let mut inner = self.lock();
        inner.issued += 1;
        prepare(&mut inner);
        inner.issued
    }

    /// Applies `apply` only if `ticket` is still the newest issued.
    /// Returns whether the result was applied.
    fn commit(&self, ticket: u64, apply: impl FnOnce(&mut SessionInner)) -> bool {
        let mut inner = self.lock();
        if inner.issued != ticket {
            return false;
        }
        apply(&mut inner);
        true
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex poisoned")
    }
}

/// Orchestrates login/logout/refresh/profile-fetch over the shared context.
#[derive(Clone)]
pub struct SessionManager {
    client: Arc<ApiClient>,
    session: Arc<SessionContext>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let session = Arc::clone(client.session());
        Self { client, session }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    /// Restores a persisted session at startup: if a token survives on
    /// disk, validate it with a profile fetch. Returns whether the session
    /// ended up Authenticated. Any failure clears both token and user.
    pub async fn restore(&self) -> bool {
        let Some(token) = self.session.store().token() else {
            return false;
        };

        let ticket = self.session.issue_with(|inner| {
            inner.session.token = Some(token);
            inner.state = SessionState::Restoring;
        });

        match users::profile(&self.client).await {
            Ok(user) => {
                let applied = self.session.commit(ticket, |inner| {
                    inner.session.user = Some(user.clone());
                    inner.state = SessionState::Authenticated;
                });
                if applied {
                    self.session.store().set_user(&user);
                }
                applied
            }
            Err(err) => {
                tracing::warn!("session restore failed: {err}");
                if self.session.commit(ticket, |inner| {
                    inner.session = Session::default();
                    inner.state = SessionState::Anonymous;
                }) {
                    self.session.store().clear_session();
                }
                false
            }
        }
    }

    /// Authenticates with the backend. On success the session is fully
    /// populated and persisted before this returns; on failure no partial
    /// state is retained.
    ///
    /// # Errors
    /// Fails with the classified error carrying the server's message.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        let ticket = self.session.issue_with(|_| {});
        let response = auth::login(&self.client, credentials).await?;
        self.apply_auth(ticket, response.token, response.user);
        Ok(self.session.snapshot())
    }

    /// Registers a new account; the backend signs the user in directly, so
    /// this populates and persists the session like a login.
    ///
    /// # Errors
    /// Fails with the classified error carrying the server's message.
    pub async fn register(&self, registration: &Registration) -> ApiResult<Session> {
        let ticket = self.session.issue_with(|_| {});
        let response = auth::register(&self.client, registration).await?;
        self.apply_auth(ticket, response.token, response.user);
        Ok(self.session.snapshot())
    }

    /// Signs out. The server notification is best-effort; the local and
    /// persisted session are cleared unconditionally. Never fails.
    pub async fn logout(&self) {
        if self.session.is_authenticated()
            && let Err(err) = auth::logout(&self.client).await
        {
            tracing::warn!("logout notification failed: {err}");
        }
        self.session.clear();
    }

    /// Fetches the authoritative profile for the current token and caches
    /// it. Requires a present token.
    ///
    /// # Errors
    /// Fails with the classified error; on Unauthorized/Forbidden the
    /// session is cleared before the error is re-raised.
    pub async fn fetch_profile(&self) -> ApiResult<User> {
        if !self.session.is_authenticated() {
            return Err(ApiError::new(ErrorCategory::Unauthorized, "Not signed in"));
        }

        let ticket = self.session.issue_with(|_| {});
        match users::profile(&self.client).await {
            Ok(user) => {
                if self.session.commit(ticket, |inner| {
                    inner.session.user = Some(user.clone());
                }) {
                    self.session.store().set_user(&user);
                }
                Ok(user)
            }
            Err(err) => {
                if matches!(
                    err.category,
                    ErrorCategory::Unauthorized | ErrorCategory::Forbidden
                ) {
                    self.session.clear();
                }
                Err(err)
            }
        }
    }

    /// Exchanges the current token for a fresh one. Returns whether the
    /// refresh took effect; on failure the session is cleared.
    pub async fn refresh_token(&self) -> bool {
        let ticket = self.session.issue_with(|inner| {
            if inner.state == SessionState::Authenticated {
                inner.state = SessionState::Refreshing;
            }
        });

        match auth::refresh(&self.client).await {
            Ok(response) => {
                let applied = self.session.commit(ticket, |inner| {
                    inner.session.token = Some(response.token.clone());
                    inner.state = SessionState::Authenticated;
                });
                if applied {
                    self.session.store().set_token(&response.token);
                }
                applied
            }
            Err(err) => {
                tracing::warn!("token refresh failed: {err}");
                if self.session.commit(ticket, |inner| {
                    inner.session = Session::default();
                    inner.state = SessionState::Anonymous;
                }) {
                    self.session.store().clear_session();
                }
                false
            }
        }
    }

    /// Inspects the token's `exp` claim and schedules a background refresh
    /// when under [`REFRESH_THRESHOLD_SECS`] remain. Returns whether the
    /// token is currently unexpired. An undecodable token is treated as not
    /// about to expire: no refresh, no logout. Expiry is enforced
    /// server-side anyway.
    pub fn check_expiry(&self) -> bool {
        let Some(token) = self.session.snapshot().token else {
            return false;
        };
        let Some(exp) = decode_expiry(&token) else {
            return true;
        };

        let now = now_secs();
        if exp.saturating_sub(now) < REFRESH_THRESHOLD_SECS {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.refresh_token().await;
            });
        }
        exp > now
    }

    /// Updates profile fields and refreshes the cached user.
    ///
    /// # Errors
    /// Fails with the classified error when the update is rejected.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let ticket = self.session.issue_with(|_| {});
        let user = users::update_profile(&self.client, update).await?;
        if self.session.commit(ticket, |inner| {
            inner.session.user = Some(user.clone());
        }) {
            self.session.store().set_user(&user);
        }
        Ok(user)
    }

    /// Uploads a new avatar and patches the cached user's avatar
    /// reference. Returns the new reference.
    ///
    /// # Errors
    /// Fails with the classified error when the upload is rejected.
    pub async fn upload_avatar(&self, filename: &str, bytes: Vec<u8>) -> ApiResult<String> {
        let ticket = self.session.issue_with(|_| {});
        let response = users::upload_avatar(&self.client, filename, bytes).await?;
        let applied = self.session.commit(ticket, |inner| {
            if let Some(user) = inner.session.user.as_mut() {
                user.avatar = Some(response.avatar.clone());
            }
        });
        if applied && let Some(user) = self.session.snapshot().user {
            self.session.store().set_user(&user);
        }
        Ok(response.avatar)
    }

    /// Changes the password for the signed-in user.
    ///
    /// # Errors
    /// Fails with the classified error when the old password is rejected.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ApiResult<()> {
        auth::change_password(&self.client, old_password, new_password).await?;
        Ok(())
    }

    /// Requests a password-reset mail. Stateless: no session change.
    ///
    /// # Errors
    /// Fails with the classified error when the request is rejected.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        auth::forgot_password(&self.client, email).await?;
        Ok(())
    }

    /// Completes a password reset with the mailed token. Stateless.
    ///
    /// # Errors
    /// Fails with the classified error when the reset token is invalid.
    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> ApiResult<()> {
        auth::reset_password(&self.client, reset_token, new_password).await?;
        Ok(())
    }

    /// Applies a successful login/registration result: memory first, then
    /// the persisted record, so the store never holds credentials the
    /// in-memory session does not.
    fn apply_auth(&self, ticket: u64, token: String, user: User) {
        let applied = self.session.commit(ticket, |inner| {
            inner.session.token = Some(token.clone());
            inner.session.user = Some(user.clone());
            inner.state = SessionState::Authenticated;
        });
        if applied {
            self.session.store().set_token(&token);
            self.session.store().set_user(&user);
        }
    }
}

/// Extracts the `exp` claim (seconds since epoch) from a JWT without
/// verifying the signature. Expiry is enforced server-side; this is only a
/// refresh-scheduling hint.
fn decode_expiry(token: &str) -> Option<u64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let decoded = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    let json: Value = serde_json::from_slice(&decoded).ok()?;
    json.get("exp").and_then(Value::as_u64)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
