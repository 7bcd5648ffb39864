//! CLI configuration: thin wrapper around `wallet_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout).

use std::time::Duration;

use wallet_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use wallet_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config, session_path,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// The active profile, with a helpful error listing what exists.
pub fn active_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    match config.profile(&name) {
        Ok(profile) => Ok((name, profile)),
        Err(wallet_config::ConfigError::UnknownProfile { name }) => {
            let available: Vec<_> = config.profiles.keys().cloned().collect();
            Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            })
        }
        Err(other) => Err(other.into()),
    }
}

/// Translate the active profile + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, mut profile) = active_profile(global, &cfg)?;

    // 1. API URL (flag > env > profile)
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }

    let mut client = wallet_config::profile_to_client_config(&profile, &name, &cfg.defaults)?;

    // 2. TLS verification
    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 3. Timeout
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(profile = %name, api_url = %client.api_url, "resolved client config");
    Ok(client)
}
