// ── Session manager ──
//
// Single owner of the signed-in identity. Writes go to durable storage
// first and then to the in-memory state, which is published on a watch
// channel; transitions are announced on a broadcast channel. The API
// client reads credentials through the `CredentialProvider` impl, which
// is also how the 401 interceptor stores refreshed tokens or expires
// the session.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use wallet_api::{ApiClient, CredentialProvider, LoginCredentials, RegisterData, TokenPair, User};

use crate::error::CoreError;
use crate::session::storage::{
    REFRESH_TOKEN_KEY, SESSION_KEYS, SessionStorage, TOKEN_KEY, USER_KEY,
};

const EVENT_CHANNEL_SIZE: usize = 32;

/// The signed-in user plus credentials.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

/// Session transitions, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionEvent {
    /// A stored session was loaded at start-up.
    Restored,
    LoggedIn,
    Registered,
    /// The access token was silently renewed.
    Refreshed,
    UserUpdated,
    LoggedOut,
    /// Renewal failed; the session was cleared.
    Expired,
}

/// Owns the session lifecycle.
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            storage,
            state,
            events,
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Watch the current session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Receive session transitions from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load a stored session and refresh its user snapshot.
    ///
    /// Needs both a stored access token and a user snapshot. A failed
    /// profile fetch keeps the stored snapshot; an expired token is
    /// handled by the API client's refresh path.
    pub async fn restore(&self, api: &ApiClient) -> Result<Option<Session>, CoreError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let refresh = self.storage.get(REFRESH_TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        let (Some(token), Some(refresh), Some(user)) = (token, refresh, user) else {
            self.clear_storage();
            return Ok(None);
        };
        let user: User = match serde_json::from_str(&user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "stored user snapshot is unreadable, discarding session");
                self.clear_storage();
                return Ok(None);
            }
        };

        info!(email = %user.email, "restored stored session");
        self.state.send_replace(Some(Session {
            user,
            tokens: TokenPair::new(token, refresh),
        }));
        self.emit(SessionEvent::Restored);

        match api.get_profile().await {
            Ok(fresh) => self.update_user(fresh)?,
            Err(e) => warn!(error = %e, "failed to fetch user profile"),
        }
        Ok(self.current())
    }

    /// Sign in with email and password.
    pub async fn login(
        &self,
        api: &ApiClient,
        credentials: &LoginCredentials,
    ) -> Result<Session, CoreError> {
        let (user, tokens) = api.login(credentials).await?.into_parts();
        self.establish(user, tokens, SessionEvent::LoggedIn)
    }

    /// Create an account and sign in.
    pub async fn register(&self, api: &ApiClient, data: &RegisterData) -> Result<Session, CoreError> {
        let (user, tokens) = api.register(data).await?.into_parts();
        self.establish(user, tokens, SessionEvent::Registered)
    }

    /// Exchange `refresh_token` for a new pair.
    ///
    /// Keeps the current user snapshot (in memory or stored). A rejected
    /// refresh token expires the session.
    pub async fn refresh(
        &self,
        api: &ApiClient,
        refresh_token: &SecretString,
    ) -> Result<Session, CoreError> {
        let user = match self.user() {
            Some(user) => user,
            None => self.stored_user()?.ok_or_else(|| CoreError::Unauthorized {
                message: "no session to refresh".into(),
            })?,
        };

        let tokens = match api.refresh_token(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                let err = CoreError::from(e);
                if err.is_auth_expired() {
                    self.expire_session();
                }
                return Err(err);
            }
        };

        self.persist_tokens(&tokens)?;
        let session = Session { user, tokens };
        self.state.send_replace(Some(session.clone()));
        info!("session refreshed");
        self.emit(SessionEvent::Refreshed);
        Ok(session)
    }

    /// Sign out. Always succeeds and is idempotent.
    pub fn logout(&self) {
        self.clear_storage();
        self.state.send_replace(None);
        info!("logged out");
        self.emit(SessionEvent::LoggedOut);
    }

    /// Replace the user snapshot after a profile change.
    pub fn update_user(&self, user: User) -> Result<(), CoreError> {
        if !self.is_authenticated() {
            return Err(CoreError::Unauthorized {
                message: "no active session".into(),
            });
        }
        self.storage.set(USER_KEY, &encode_user(&user)?)?;
        self.state.send_modify(|state| {
            if let Some(session) = state.as_mut() {
                session.user = user;
            }
        });
        debug!("user snapshot updated");
        self.emit(SessionEvent::UserUpdated);
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Replace any previous session with a fresh one.
    pub(crate) fn establish(
        &self,
        user: User,
        tokens: TokenPair,
        event: SessionEvent,
    ) -> Result<Session, CoreError> {
        let encoded_user = encode_user(&user)?;
        for key in SESSION_KEYS {
            self.storage.remove(key)?;
        }
        self.persist_tokens(&tokens)?;
        self.storage.set(USER_KEY, &encoded_user)?;

        let session = Session { user, tokens };
        self.state.send_replace(Some(session.clone()));
        info!(email = %session.user.email, %event, "session established");
        self.emit(event);
        Ok(session)
    }

    fn persist_tokens(&self, tokens: &TokenPair) -> Result<(), CoreError> {
        self.storage.set(TOKEN_KEY, tokens.access.expose_secret())?;
        self.storage
            .set(REFRESH_TOKEN_KEY, tokens.refresh.expose_secret())
    }

    fn stored_user(&self) -> Result<Option<User>, CoreError> {
        self.storage
            .get(USER_KEY)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| CoreError::Storage {
                    message: format!("stored user snapshot: {e}"),
                })
            })
            .transpose()
    }

    /// Remove every session key, logging failures instead of failing.
    fn clear_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear session key");
            }
        }
    }

    /// Announces `Expired` only when a session was actually live.
    fn expire_session(&self) {
        self.clear_storage();
        if self.state.send_replace(None).is_none() {
            debug!("no active session to expire");
            return;
        }
        warn!("session expired");
        self.emit(SessionEvent::Expired);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn encode_user(user: &User) -> Result<String, CoreError> {
    serde_json::to_string(user).map_err(|e| CoreError::Internal(format!("encode user: {e}")))
}

// ── Credentials for the API client ───────────────────────────────────

impl CredentialProvider for SessionManager {
    fn access_token(&self) -> Option<SecretString> {
        self.state.borrow().as_ref().map(|s| s.tokens.access.clone())
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.state.borrow().as_ref().map(|s| s.tokens.refresh.clone())
    }

    fn store_refreshed(&self, tokens: TokenPair) {
        if !self.is_authenticated() {
            debug!("session ended during refresh, dropping new tokens");
            return;
        }
        if let Err(e) = self.persist_tokens(&tokens) {
            warn!(error = %e, "failed to persist refreshed tokens");
        }
        self.state.send_modify(|state| {
            if let Some(session) = state.as_mut() {
                session.tokens = tokens;
            }
        });
        debug!("stored refreshed tokens");
        self.emit(SessionEvent::Refreshed);
    }

    fn expire(&self) {
        self.expire_session();
    }
}
