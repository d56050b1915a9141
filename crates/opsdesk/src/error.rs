//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use opsdesk_config::ConfigError;
use opsdesk_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the console at {url}")]
    #[diagnostic(
        code(opsdesk::connection_failed),
        help(
            "Check that the console gateway is running and reachable.\n\
             Try: opsdesk config show"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(opsdesk::timeout),
        help("Increase timeout with --timeout or check the gateway's responsiveness.")
    )]
    Timeout,

    // ── Session ──────────────────────────────────────────────────────

    #[error("Not logged in")]
    #[diagnostic(code(opsdesk::not_authenticated), help("Run: opsdesk login"))]
    NotAuthenticated,

    #[error("Session expired: {message}")]
    #[diagnostic(code(opsdesk::session_expired), help("Run: opsdesk login"))]
    SessionExpired { message: String },

    // ── Console responses ────────────────────────────────────────────

    #[error("The console rejected the request (err {code}): {message}")]
    #[diagnostic(code(opsdesk::rejected))]
    Rejected { code: i64, message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(opsdesk::not_found),
        help("Run: opsdesk {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("API error: {message}")]
    #[diagnostic(code(opsdesk::api_error))]
    ApiError { message: String, status: Option<u16> },

    #[error("Request cancelled")]
    #[diagnostic(code(opsdesk::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(opsdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Environment '{name}' is not configured")]
    #[diagnostic(
        code(opsdesk::unknown_environment),
        help(
            "Add an [environments.{name}.default] table to {path}\n\
             or run: opsdesk config init"
        )
    )]
    UnknownEnvironment { name: String, path: String },

    #[error(transparent)]
    #[diagnostic(code(opsdesk::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(opsdesk::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(opsdesk::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotAuthenticated | Self::SessionExpired { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::UnknownEnvironment { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Cancelled => CliError::Cancelled,
            CoreError::SessionExpired { message } => CliError::SessionExpired { message },
            CoreError::NotAuthenticated => CliError::NotAuthenticated,
            CoreError::Rejected { code, message } => CliError::Rejected { code, message },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Api {
                message,
                status: Some(404),
            } => CliError::NotFound {
                resource_type: "resource".into(),
                identifier: message,
                list_command: "--help".into(),
            },
            CoreError::Api { message, status } => CliError::ApiError { message, status },
            CoreError::Decode { message } => CliError::ApiError {
                message: format!("unexpected response: {message}"),
                status: None,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Storage { message } => {
                CliError::Io(std::io::Error::other(format!("state file: {message}")))
            }
        }
    }
}

impl From<opsdesk_api::Error> for CliError {
    fn from(err: opsdesk_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownEnvironment { environment } => CliError::UnknownEnvironment {
                name: environment,
                path: opsdesk_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
