use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Access + refresh token pair issued by the backend.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: SecretString::from(refresh.into()),
        }
    }
}

/// Where the API client reads the bearer credential from, and where the
/// 401 interceptor writes a refreshed pair back to.
///
/// The session layer implements this; the client never persists tokens
/// itself.
pub trait CredentialProvider: Send + Sync {
    /// Current access token, attached as `Authorization: Bearer <token>`.
    fn access_token(&self) -> Option<SecretString>;

    /// Current refresh token, exchanged on a 401.
    fn refresh_token(&self) -> Option<SecretString>;

    /// Store the pair returned by a successful silent refresh.
    fn store_refreshed(&self, tokens: TokenPair);

    /// The silent refresh failed: drop every credential and leave the
    /// user unauthenticated.
    fn expire(&self);
}

/// How concurrent 401 responses share a refresh.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Every request that receives a 401 runs its own refresh.
    ///
    /// Concurrent failures each spend the refresh token; with rotating
    /// refresh tokens all but the first exchange fail and expire the
    /// session.
    #[default]
    PerRequest,
    /// Refreshes are serialized. A request that waited on an in-progress
    /// refresh retries with the newly stored token instead of refreshing
    /// again.
    SingleFlight,
}

/// Process-local credential holder.
///
/// Handy for scripts and tests that do not need durable storage.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    tokens: RwLock<Option<TokenPair>>,
}

impl InMemoryCredentials {
    pub fn new(tokens: Option<TokenPair>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, tokens: Option<TokenPair>) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }
}

impl CredentialProvider for InMemoryCredentials {
    fn access_token(&self) -> Option<SecretString> {
        self.tokens().map(|t| t.access)
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.tokens().map(|t| t.refresh)
    }

    fn store_refreshed(&self, tokens: TokenPair) {
        self.set(Some(tokens));
    }

    fn expire(&self) {
        self.set(None);
    }
}
