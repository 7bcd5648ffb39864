//! Shared configuration for wallet tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! platform paths for the config and session files, and translation to
//! `wallet_core::ClientConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wallet_core::{
    ClientConfig, DEFAULT_API_URL, RefreshPolicy, RetryPolicy, SessionStore, TlsVerification,
};

/// Keyring service name.
const KEYRING_SERVICE: &str = "wallet";

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "WALLET_CONFIG";
/// Overrides the session file location.
pub const SESSION_ENV: &str = "WALLET_SESSION_FILE";
pub const EMAIL_ENV: &str = "WALLET_EMAIL";
pub const PASSWORD_ENV: &str = "WALLET_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the override, else `default_profile`,
    /// else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned()
    }

    /// The named profile. A missing `"default"` profile resolves to a
    /// local backend so a fresh install works without a config file.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == "default" => Ok(Profile::default()),
            None => Err(ConfigError::UnknownProfile { name: name.into() }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retries for transient read failures.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    1
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root, e.g. "http://localhost:3000/api".
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Login email.
    pub email: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// "per-request" or "single-flight".
    pub refresh_policy: Option<RefreshPolicy>,

    /// Override retries.
    pub retries: Option<u32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            email: None,
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            refresh_policy: None,
            retries: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "wallet", "wallet")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path: `$WALLET_CONFIG`, else the platform
/// config dir.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".config", "wallet", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where a profile's session is kept between runs:
/// `$WALLET_SESSION_FILE`, else `session.json` in the platform data dir
/// (`session-<profile>.json` for non-default profiles).
pub fn session_path(profile_name: &str) -> PathBuf {
    if let Ok(path) = std::env::var(SESSION_ENV) {
        return PathBuf::from(path);
    }
    let file = if profile_name == "default" {
        "session.json".to_owned()
    } else {
        format!("session-{profile_name}.json")
    };
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "wallet", file.as_str()]),
        |dirs| dirs.data_dir().join(&file),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then `WALLET_`-prefixed env vars with `__` as the
/// nesting separator (`WALLET_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WALLET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Login email: profile, else `$WALLET_EMAIL`.
pub fn resolve_email(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .email
        .clone()
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the password without CLI flags.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var: the profile's own, then the global one
    let env_names = profile.password_env.as_deref().into_iter().chain([PASSWORD_ENV]);
    for name in env_names {
        if let Ok(pw) = std::env::var(name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Save a password to the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

// ── Profile → ClientConfig ──────────────────────────────────────────

/// Build a `ClientConfig` from a profile, no CLI flag overrides.
/// The session is persisted to [`session_path`].
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let api_url = parse_api_url(&profile.api_url)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let retries = profile.retries.unwrap_or(defaults.retries);

    Ok(ClientConfig {
        api_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        refresh_policy: profile.refresh_policy.unwrap_or_default(),
        retry: RetryPolicy::default().with_retries(retries),
        cache_capacity: wallet_core::cache::DEFAULT_CAPACITY,
        session_store: SessionStore::File(session_path(profile_name)),
    })
}

/// Parse an API root. Only http(s) URLs that can carry a path qualify.
pub fn parse_api_url(raw: &str) -> Result<url::Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "api_url".into(),
        reason,
    };
    let url: url::Url = raw
        .parse()
        .map_err(|e| invalid(format!("'{raw}' is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid(format!("'{raw}' must be an http(s) URL")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
        default_profile = "home"

        [defaults]
        timeout = 10

        [profiles.home]
        api_url = "https://wallet.example.com/api"
        email = "a@b.com"
        password_env = "HOME_WALLET_PW"
        refresh_policy = "single-flight"

        [profiles.dev]
        api_url = "http://localhost:3000/api"
        password = "plain"
        insecure = true
        retries = 0
    "#;

    #[test]
    fn loads_profiles_with_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("WALLET_DEFAULTS__TIMEOUT", "5");

            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

            assert_eq!(config.profile_name(None), "home");
            assert_eq!(config.profile_name(Some("dev")), "dev");
            assert_eq!(config.defaults.timeout, 5);
            assert_eq!(config.defaults.output, "table");
            assert_eq!(config.profiles.len(), 2);
            Ok(())
        });
    }

    #[test]
    fn config_path_honours_override() {
        Jail::expect_with(|jail| {
            jail.set_env(CONFIG_ENV, "custom.toml");
            jail.set_env(SESSION_ENV, "s.json");
            assert_eq!(config_path(), PathBuf::from("custom.toml"));
            assert_eq!(session_path("dev"), PathBuf::from("s.json"));
            Ok(())
        });
    }

    #[test]
    fn profile_translates_to_client_config() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

            let home = config.profile("home").map_err(|e| e.to_string())?;
            let client = profile_to_client_config(&home, "home", &config.defaults)
                .map_err(|e| e.to_string())?;
            assert_eq!(client.api_url.as_str(), "https://wallet.example.com/api");
            assert_eq!(client.tls, TlsVerification::SystemDefaults);
            assert_eq!(client.timeout, Duration::from_secs(10));
            assert_eq!(client.refresh_policy, RefreshPolicy::SingleFlight);
            assert_eq!(client.retry.retries, 1);
            assert!(matches!(client.session_store, SessionStore::File(_)));

            let dev = config.profile("dev").map_err(|e| e.to_string())?;
            let client = profile_to_client_config(&dev, "dev", &config.defaults)
                .map_err(|e| e.to_string())?;
            assert_eq!(client.tls, TlsVerification::DangerAcceptInvalid);
            assert_eq!(client.refresh_policy, RefreshPolicy::PerRequest);
            assert_eq!(client.retry.retries, 0);
            Ok(())
        });
    }

    #[test]
    fn missing_profiles() {
        let config = Config::default();
        let fallback = config.profile("default").unwrap_or_default();
        assert_eq!(fallback.api_url, DEFAULT_API_URL);
        assert!(matches!(
            config.profile("work"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn password_from_profile_env_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME_WALLET_PW", "from-env");
            let profile = Profile {
                password_env: Some("HOME_WALLET_PW".into()),
                password: Some("plain".into()),
                ..Profile::default()
            };
            let pw = resolve_password(&profile, "home").map_err(|e| e.to_string())?;
            assert_eq!(pw.expose_secret(), "from-env");

            jail.set_env(EMAIL_ENV, "env@b.com");
            let email = resolve_email(&profile, "home").map_err(|e| e.to_string())?;
            assert_eq!(email, "env@b.com");
            Ok(())
        });
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(parse_api_url("http://localhost:3000/api").is_ok());
        assert!(matches!(
            parse_api_url("mailto:a@b.com"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn save_round_trips_through_toml() {
        Jail::expect_with(|jail| {
            let mut config = Config::default();
            config.profiles.insert(
                "default".into(),
                Profile {
                    email: Some("a@b.com".into()),
                    ..Profile::default()
                },
            );
            let path = jail.directory().join("nested").join("config.toml");
            save_config_to(&config, &path).map_err(|e| e.to_string())?;

            let loaded = load_config_from(&path).map_err(|e| e.to_string())?;
            assert_eq!(loaded.profiles["default"].email.as_deref(), Some("a@b.com"));
            assert_eq!(loaded.profiles["default"].api_url, DEFAULT_API_URL);
            Ok(())
        });
    }
}
