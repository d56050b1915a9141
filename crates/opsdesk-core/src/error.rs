// ── Core error types ──
//
// User-facing errors from opsdesk-core. Front ends never branch on HTTP
// status codes or envelope parsing directly; the `From<opsdesk_api::Error>`
// impl folds transport-layer failures into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the console at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Console request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    // ── Session errors ───────────────────────────────────────────────
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    // ── Operation errors ─────────────────────────────────────────────
    /// The server understood the request and refused it (`err != 0`).
    #[error("Rejected by the console (err {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Unexpected response: {message}")]
    Decode { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Local storage error: {message}")]
    Storage { message: String },
}

impl CoreError {
    /// Whether a fresh login would fix this.
    pub fn needs_login(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::NotAuthenticated)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<opsdesk_api::Error> for CoreError {
    fn from(err: opsdesk_api::Error) -> Self {
        use opsdesk_api::Error as Api;
        match err {
            Api::Transport(ref e) => {
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
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::Status {
                status, message, ..
            } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::Cancelled => CoreError::Cancelled,
            Api::SessionExpired { cause, message } => CoreError::SessionExpired {
                message: if message.is_empty() {
                    format!("{cause} -- log in again")
                } else {
                    message
                },
            },
            Api::NotAuthenticated => CoreError::NotAuthenticated,
            Api::Business { code, message } => CoreError::Rejected { code, message },
            Api::Decode { message } => CoreError::Decode { message },
            Api::Deserialization { message, body: _ } => CoreError::Decode { message },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::UnknownGateway {
                environment,
                gateway,
            } => CoreError::Config {
                message: format!(
                    "no gateway '{gateway}' configured for environment '{environment}'"
                ),
            },
            Api::InvalidRequest(message) => CoreError::ValidationFailed { message },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Storage(e) => CoreError::Storage {
                message: e.to_string(),
            },
        }
    }
}

impl From<opsdesk_api::StorageError> for CoreError {
    fn from(err: opsdesk_api::StorageError) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}
