use thiserror::Error;

/// A single field-level validation message returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FieldMessage {
    #[serde(alias = "path", alias = "param")]
    pub field: String,
    #[serde(alias = "msg")]
    pub message: String,
}

/// Top-level error type for the `wallet-api` crate.
///
/// Covers every failure mode of the REST surface: authentication,
/// transport, HTTP status classes, and envelope decoding.
/// `wallet-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected the email/password pair.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// The access token was rejected (HTTP 401) on a non-auth endpoint.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The refresh token was rejected or could not be exchanged.
    #[error("Refresh token expired or revoked: {message}")]
    RefreshExpired { message: String },

    /// The session could not be renewed after a 401 and has been cleared.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The authenticated user may not perform this operation (HTTP 403).
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // ── Client errors ───────────────────────────────────────────────
    /// The backend rejected the payload (HTTP 400 / 422).
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldMessage>,
    },

    /// Resource conflict, e.g. duplicate email (HTTP 409).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Resource does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound { message: String },

    // ── Server errors ───────────────────────────────────────────────
    /// Any other non-success status, or an envelope with `success: false`.
    ///
    /// `message` is only ever the JSON `message`/`error` field; a body that
    /// is not JSON lands in `body` (truncated) for diagnostics.
    #[error(
        "Server error (HTTP {status}): {}",
        if message.is_empty() { body } else { message }
    )]
    Server {
        status: u16,
        message: String,
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// A request body could not be encoded as JSON.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the caller must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::RefreshExpired { .. } | Self::SessionExpired
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }

    /// The message the backend put in its JSON error body, if any.
    ///
    /// Raw non-JSON bodies (proxy pages, HTML) never count. Used by callers that surface the server's wording to the user and
    /// fall back to their own text otherwise.
    pub fn server_message(&self) -> Option<&str> {
        let message = match self {
            Self::InvalidCredentials { message }
            | Self::Unauthorized { message }
            | Self::RefreshExpired { message }
            | Self::Forbidden { message }
            | Self::Validation { message, .. }
            | Self::Conflict { message }
            | Self::NotFound { message }
            | Self::Server { message, .. } => message.as_str(),
            _ => return None,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Server {
            status: 503,
            message: "maintenance".into(),
            body: String::new(),
        };
        assert!(err.is_transient());

        let err = Error::Server {
            status: 418,
            message: String::new(),
            body: String::new(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn empty_server_message_is_none() {
        let err = Error::Conflict {
            message: String::new(),
        };
        assert_eq!(err.server_message(), None);

        let err = Error::Conflict {
            message: "Email já cadastrado".into(),
        };
        assert_eq!(err.server_message(), Some("Email já cadastrado"));
    }

    #[test]
    fn raw_body_is_shown_but_never_a_server_message() {
        let err = Error::Server {
            status: 502,
            message: String::new(),
            body: "<html>502 Bad Gateway</html>".into(),
        };
        assert_eq!(err.server_message(), None);
        assert_eq!(
            err.to_string(),
            "Server error (HTTP 502): <html>502 Bad Gateway</html>"
        );
    }

    #[test]
    fn auth_expiry_classification() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            Error::Unauthorized {
                message: String::new()
            }
            .is_auth_expired()
        );
        assert!(
            !Error::InvalidCredentials {
                message: String::new()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn field_message_accepts_common_aliases() {
        let parsed: FieldMessage =
            serde_json::from_str(r#"{"path":"email","msg":"invalid"}"#).unwrap();
        assert_eq!(parsed.field, "email");
        assert_eq!(parsed.message, "invalid");
    }
}
