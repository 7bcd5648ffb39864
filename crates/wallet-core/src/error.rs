// ── Core error types ──
//
// User-facing errors from wallet-core. Consumers never see reqwest or
// serde errors directly: the `From<wallet_api::Error>` impl translates
// transport-layer failures into domain variants. The type is `Clone`
// because one failed fetch is handed to every caller that joined it.

use thiserror::Error;
use wallet_api::FieldMessage;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to the backend timed out")]
    Timeout,

    // ── Authentication errors ────────────────────────────────────────
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Not authenticated: {message}")]
    Unauthorized { message: String },

    #[error("Refresh token expired or revoked: {message}")]
    RefreshExpired { message: String },

    #[error("Session expired -- log in again")]
    SessionExpired,

    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        fields: Vec<FieldMessage>,
    },

    // ── Server errors ────────────────────────────────────────────────
    #[error(
        "Server error (HTTP {status}){}",
        if message.is_empty() { String::new() } else { format!(": {message}") }
    )]
    Server { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    Api { message: String },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session storage error: {message}")]
    Storage { message: String },

    /// The view that requested the data went away before it arrived.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a validation error from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Connection drops, timeouts, and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The user has to authenticate again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::RefreshExpired { .. } | Self::Unauthorized { .. }
        )
    }

    /// The backend's own wording, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        let message = match self {
            Self::InvalidCredentials { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Conflict { message }
            | Self::ValidationFailed { message, .. }
            | Self::Server { message, .. } => message.as_str(),
            _ => return None,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Server wording if present, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_owned()
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wallet_api::Error> for CoreError {
    fn from(err: wallet_api::Error) -> Self {
        match err {
            wallet_api::Error::InvalidCredentials { message } => {
                CoreError::InvalidCredentials { message }
            }
            wallet_api::Error::Unauthorized { message } => CoreError::Unauthorized { message },
            wallet_api::Error::RefreshExpired { message } => CoreError::RefreshExpired { message },
            wallet_api::Error::SessionExpired => CoreError::SessionExpired,
            wallet_api::Error::Forbidden { message } => CoreError::Forbidden { message },
            wallet_api::Error::Validation { message, fields } => {
                CoreError::ValidationFailed { message, fields }
            }
            wallet_api::Error::Conflict { message } => CoreError::Conflict { message },
            wallet_api::Error::NotFound { message } => CoreError::NotFound { message },
            wallet_api::Error::Server {
                status, message, ..
            } => CoreError::Server { status, message },
            wallet_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                    }
                }
            }
            wallet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            wallet_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            wallet_api::Error::Encode(e) => CoreError::Internal(format!("encode: {e}")),
            wallet_api::Error::Deserialization { message, .. } => CoreError::Api { message },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn refresh_failures_require_login() {
        let err: CoreError = wallet_api::Error::RefreshExpired {
            message: "revoked".into(),
        }
        .into();
        assert!(matches!(err, CoreError::RefreshExpired { .. }));
        assert!(err.is_auth_expired());

        let err: CoreError = wallet_api::Error::SessionExpired.into();
        assert!(matches!(err, CoreError::SessionExpired));
    }

    #[test]
    fn validation_keeps_fields() {
        let err: CoreError = wallet_api::Error::Validation {
            message: "Dados inválidos".into(),
            fields: vec![FieldMessage {
                field: "amount".into(),
                message: "Valor inválido".into(),
            }],
        }
        .into();
        match err {
            CoreError::ValidationFailed { fields, .. } => assert_eq!(fields.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn user_message_prefers_server_wording() {
        let err = CoreError::Conflict {
            message: "Email já cadastrado".into(),
        };
        assert_eq!(err.user_message("Erro ao criar conta"), "Email já cadastrado");

        let err = CoreError::Server {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message("Erro ao criar conta"), "Erro ao criar conta");
        assert!(err.is_transient());
        assert!(!CoreError::Cancelled.is_transient());
    }
}
