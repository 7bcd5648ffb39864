// ── Runtime client configuration ──
//
// Describes how to reach the backend and how the cache behaves. Never
// touches disk itself: the CLI builds a `ClientConfig` from the
// config file and flags and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use wallet_api::RefreshPolicy;

use crate::cache::{DEFAULT_CAPACITY, RetryPolicy};

/// Default backend root, matching a locally running server.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Where the session (tokens + user snapshot) is kept between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStore {
    /// Process memory only; nothing survives exit.
    #[default]
    Memory,
    /// A JSON file, created on first write.
    File(PathBuf),
}

/// Configuration for one backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:3000/api`.
    pub api_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How concurrent 401s share a token refresh.
    pub refresh_policy: RefreshPolicy,
    /// Retry behaviour for cached queries. Mutations are never retried.
    pub retry: RetryPolicy,
    /// Upper bound on cached query entries.
    pub cache_capacity: usize,
    pub session_store: SessionStore,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_policy: RefreshPolicy::default(),
            retry: RetryPolicy::default(),
            cache_capacity: DEFAULT_CAPACITY,
            session_store: SessionStore::default(),
        }
    }
}
