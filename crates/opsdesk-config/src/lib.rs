//! Shared configuration for opsdesk front ends.
//!
//! TOML config with per-environment gateway tables, token resolution
//! (env + keyring + plaintext), and translation to
//! `opsdesk_core::ConsoleConfig`. The CLI layers its flag overrides on
//! top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use opsdesk_api::{GatewayTable, GatewayTarget, Routing, TlsMode};
use opsdesk_core::{ConsoleConfig, MonitorConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keyring service name for stored gateway tokens.
pub const KEYRING_SERVICE: &str = "opsdesk";

/// Environment name that selects local development routing.
pub const DEVELOPMENT: &str = "development";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no environment '{environment}' configured")]
    UnknownEnvironment { environment: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub monitor: MonitorSettings,

    /// environment → gateway key → entry.
    #[serde(default)]
    pub environments: HashMap<String, HashMap<String, GatewayEntry>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Active environment; `development` routes to `dev_base`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Gateway for requests that do not pick one.
    #[serde(default = "default_gateway")]
    pub gateway: String,

    /// Local development server, used when `environment = "development"`.
    #[serde(default = "default_dev_base")]
    pub dev_base: String,

    /// Envelope `err` codes meaning "session invalid".
    #[serde(default = "default_session_invalid_codes")]
    pub session_invalid_codes: Vec<i64>,

    #[serde(default = "default_logout_delay_ms")]
    pub logout_delay_ms: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            environment: default_environment(),
            gateway: default_gateway(),
            dev_base: default_dev_base(),
            session_invalid_codes: default_session_invalid_codes(),
            logout_delay_ms: default_logout_delay_ms(),
            insecure: false,
            ca_cert: None,
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
fn default_environment() -> String {
    DEVELOPMENT.into()
}
fn default_gateway() -> String {
    opsdesk_api::routing::DEFAULT_GATEWAY.into()
}
fn default_dev_base() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_session_invalid_codes() -> Vec<i64> {
    opsdesk_api::DEFAULT_SESSION_INVALID_CODES.to_vec()
}
fn default_logout_delay_ms() -> u64 {
    300
}

/// `[monitor]` section: alarm watch pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,

    #[serde(default = "default_flip_interval_ms")]
    pub flip_interval_ms: u64,

    /// Start `alarms watch` with the audible alert on.
    #[serde(default)]
    pub alert: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            pulse_interval_ms: default_pulse_interval_ms(),
            flip_interval_ms: default_flip_interval_ms(),
            alert: false,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}
fn default_pulse_interval_ms() -> u64 {
    1000
}
fn default_flip_interval_ms() -> u64 {
    300
}

impl MonitorSettings {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            pulse_interval: Duration::from_millis(self.pulse_interval_ms.max(1)),
            flip_interval: Duration::from_millis(self.flip_interval_ms.max(1)),
        }
    }
}

/// One gateway of one deploy environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEntry {
    /// Base URL requests for this gateway are sent to.
    pub target: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub auth_token: Option<String>,

    /// Environment variable holding the bearer token.
    pub auth_token_env: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "opsdesk", "opsdesk")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("opsdesk");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// File holding the persisted session and alarm baseline.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered config source: defaults, then the TOML file, then
/// `OPSDESK_`-prefixed env vars (`__` separates nested keys, e.g.
/// `OPSDESK_DEFAULTS__ENVIRONMENT=production`).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OPSDESK_").split("__"))
}

/// Load the layered config with `path` as the TOML layer.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_user(environment: &str, gateway: &str) -> String {
    format!("{environment}/{gateway}/token")
}

/// Resolve a gateway's bearer token: env var, then keyring, then
/// plaintext. `None` means requests carry the session token.
pub fn resolve_gateway_token(
    entry: &GatewayEntry,
    environment: &str,
    gateway: &str,
) -> Option<SecretString> {
    // 1. Entry's auth_token_env → env var lookup
    if let Some(ref env_name) = entry.auth_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(keyring_entry) =
        keyring::Entry::new(KEYRING_SERVICE, &keyring_user(environment, gateway))
    {
        if let Ok(secret) = keyring_entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    entry
        .auth_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a gateway token in the system keyring.
pub fn store_gateway_token(
    environment: &str,
    gateway: &str,
    token: &str,
) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(environment, gateway))?
        .set_password(token)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

/// Build request routing for `environment`.
///
/// `development` routes every gateway to `defaults.dev_base`; any other
/// name must have an `[environments.<name>]` table.
pub fn build_routing(cfg: &Config, environment: &str) -> Result<Routing, ConfigError> {
    if environment == DEVELOPMENT && !cfg.environments.contains_key(DEVELOPMENT) {
        return Ok(Routing::Development {
            local_base: parse_url("defaults.dev_base", &cfg.defaults.dev_base)?,
        });
    }

    let gateways =
        cfg.environments
            .get(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                environment: environment.into(),
            })?;

    let mut resolved = HashMap::new();
    for (name, entry) in gateways {
        let field = format!("environments.{environment}.{name}.target");
        let mut target = GatewayTarget::new(parse_url(&field, &entry.target)?);
        if let Some(token) = resolve_gateway_token(entry, environment, name) {
            target = target.with_token(token);
        }
        resolved.insert(name.clone(), target);
    }

    let mut table = GatewayTable::new();
    table.insert(environment.to_owned(), resolved);
    Ok(Routing::Deployed {
        environment: environment.to_owned(),
        table,
    })
}

/// Build a `ConsoleConfig` from the file config. `environment` overrides
/// `defaults.environment`.
pub fn to_console_config(
    cfg: &Config,
    environment: Option<&str>,
) -> Result<ConsoleConfig, ConfigError> {
    let environment = environment.unwrap_or(&cfg.defaults.environment);
    if cfg.defaults.session_invalid_codes.contains(&0) {
        return Err(ConfigError::Validation {
            field: "defaults.session_invalid_codes".into(),
            reason: "0 is the success code".into(),
        });
    }

    let tls = if cfg.defaults.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.defaults.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let mut console = ConsoleConfig::new(build_routing(cfg, environment)?);
    console.default_gateway.clone_from(&cfg.defaults.gateway);
    console
        .session_invalid_codes
        .clone_from(&cfg.defaults.session_invalid_codes);
    console.logout_delay = Duration::from_millis(cfg.defaults.logout_delay_ms);
    console.tls = tls;
    console.timeout = Duration::from_secs(cfg.defaults.timeout);
    Ok(console)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn load(toml: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.environment, "development");
        assert_eq!(cfg.defaults.session_invalid_codes, vec![401]);
        assert_eq!(cfg.monitor.poll_interval_ms, 3000);
        assert!(cfg.environments.is_empty());
    }

    #[test]
    fn development_routes_to_local_base() {
        let cfg = load(
            r#"
            [defaults]
            dev_base = "http://localhost:9000"
            "#,
        );
        let console = to_console_config(&cfg, None).unwrap();
        let resolved = console.routing.resolve("/device/list", "default").unwrap();
        assert_eq!(
            resolved.url.as_str(),
            "http://localhost:9000/api/device/list"
        );
    }

    #[test]
    fn deployed_environment_builds_gateway_table() {
        let cfg = load(
            r#"
            [defaults]
            environment = "production"
            session_invalid_codes = [401, 10401]
            logout_delay_ms = 500

            [environments.production.default]
            target = "https://console.example.com/gw"

            [environments.production.iot]
            target = "https://iot.example.com"
            auth_token = "plain-token"

            [monitor]
            poll_interval_ms = 5000
            alert = true
            "#,
        );

        let console = to_console_config(&cfg, None).unwrap();
        assert_eq!(console.routing.environment(), "production");
        assert_eq!(console.session_invalid_codes, vec![401, 10401]);
        assert_eq!(console.logout_delay, Duration::from_millis(500));

        let iot = console.routing.resolve("/sensors", "iot").unwrap();
        assert_eq!(iot.url.as_str(), "https://iot.example.com/sensors");
        assert!(iot.auth_override.is_some());

        let monitor = cfg.monitor.to_monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_secs(5));
        assert_eq!(monitor.pulse_interval, Duration::from_secs(1));
        assert!(cfg.monitor.alert);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let cfg = load("");
        let err = to_console_config(&cfg, Some("staging")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment { ref environment } if environment == "staging"));
    }

    #[test]
    fn bad_target_url_names_the_field() {
        let cfg = load(
            r#"
            [environments.production.default]
            target = "not a url"
            "#,
        );
        let err = build_routing(&cfg, "production").unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "environments.production.default.target")
        );
    }

    #[test]
    fn success_code_cannot_be_a_sentinel() {
        let cfg = load(
            r"
            [defaults]
            session_invalid_codes = [0]
            ",
        );
        assert!(matches!(
            to_console_config(&cfg, None),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_gateways() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.environments.entry("staging".into()).or_default().insert(
            "default".into(),
            GatewayEntry {
                target: "https://staging.example.com".into(),
                auth_token: None,
                auth_token_env: Some("STAGING_TOKEN".into()),
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let entry = &loaded.environments["staging"]["default"];
        assert_eq!(entry.target, "https://staging.example.com");
        assert_eq!(entry.auth_token_env.as_deref(), Some("STAGING_TOKEN"));
    }
}
