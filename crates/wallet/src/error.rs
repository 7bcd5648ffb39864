//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use wallet_config::ConfigError;
use wallet_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the wallet backend{}", at_url(.url))]
    #[diagnostic(
        code(wallet::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Set the URL with --api-url or `api_url` in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(wallet::timeout),
        help("Increase the timeout with --timeout or check the backend's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not logged in")]
    #[diagnostic(code(wallet::not_logged_in), help("Run: wallet login"))]
    NotLoggedIn,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(wallet::auth_failed),
        help(
            "Check the email and password.\n\
             Store a password for this profile with: wallet config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Session expired")]
    #[diagnostic(code(wallet::session_expired), help("Log in again with: wallet login"))]
    SessionExpired,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(wallet::no_credentials),
        help(
            "Pass --email, set `email` in the profile, or export WALLET_EMAIL.\n\
             Configure a profile with: wallet config init"
        )
    )]
    NoCredentials { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(wallet::forbidden))]
    Forbidden { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(wallet::not_found), help("Run: wallet {list_command} to see what exists"))]
    NotFound {
        message: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(wallet::conflict))]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error(
        "Server error (HTTP {status}){}",
        if message.is_empty() { String::new() } else { format!(": {message}") }
    )]
    #[diagnostic(code(wallet::server_error))]
    Server { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(wallet::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wallet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wallet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wallet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(wallet::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wallet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(wallet::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn at_url(url: &str) -> String {
    if url.is_empty() {
        String::new()
    } else {
        format!(" at {url}")
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotLoggedIn
            | Self::AuthFailed { .. }
            | Self::SessionExpired
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the list command that shows existing records to a
    /// not-found error.
    pub fn listed_by(self, command: &str) -> Self {
        match self {
            Self::NotFound { message, .. } => Self::NotFound {
                message,
                list_command: command.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout => CliError::Timeout,

            CoreError::InvalidCredentials { message } | CoreError::Unauthorized { message } => {
                CliError::AuthFailed { message }
            }
            CoreError::RefreshExpired { .. } | CoreError::SessionExpired => {
                CliError::SessionExpired
            }
            CoreError::Forbidden { message } => CliError::Forbidden { message },

            CoreError::NotFound { message } => CliError::NotFound {
                message,
                list_command: "--help".into(),
            },
            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::ValidationFailed { message, fields } => {
                if let Some(first) = fields.first() {
                    CliError::Validation {
                        field: first.field.clone(),
                        reason: fields
                            .iter()
                            .map(|f| f.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; "),
                    }
                } else {
                    CliError::Validation {
                        field: "input".into(),
                        reason: message,
                    }
                }
            }

            CoreError::Server { status, message } => CliError::Server { status, message },
            CoreError::Api { message } => CliError::Api { message },
            CoreError::Config { message }
            | CoreError::Storage { message }
            | CoreError::Internal(message) => CliError::Internal(message),
            CoreError::Cancelled => CliError::Internal("request cancelled".into()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: wallet config show)".into(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
