use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;

/// Coarse failure class for a single request.
///
/// Every [`Error`] maps onto exactly one kind via [`Error::kind`], which is
/// what callers branch on when deciding whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level failure: connection, timeout, abort, non-2xx status.
    Network,
    /// HTTP 401 or a session-invalid business code. The forced-logout
    /// sequence has already run by the time the caller sees this.
    SessionExpired,
    /// Nonzero `err` in a 2xx envelope. The caller may continue.
    Business,
    /// The body could not be interpreted (unexpected blob content,
    /// malformed envelope).
    Decode,
    /// Failed before anything was sent: bad routing, storage, TLS setup.
    Local,
}

/// Why a session was considered lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCause {
    /// The server answered HTTP 401.
    Unauthorized,
    /// The envelope carried one of the configured session-invalid codes.
    SessionInvalid { code: i64 },
}

impl fmt::Display for ExpiryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("HTTP 401"),
            Self::SessionInvalid { code } => write!(f, "err {code}"),
        }
    }
}

/// Top-level error type for the `opsdesk-api` crate.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx, non-401 response.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        body: String,
    },

    /// The request's cancellation token fired before a response arrived.
    #[error("Request cancelled")]
    Cancelled,

    // ── Session ─────────────────────────────────────────────────────
    /// Session lost. Local session state has been cleared.
    #[error("Session expired ({cause}) -- log in again")]
    SessionExpired { cause: ExpiryCause, message: String },

    /// An operation needed a session and none is stored.
    #[error("Not logged in")]
    NotAuthenticated,

    // ── Envelope ────────────────────────────────────────────────────
    /// Business-rule failure reported through the `{err, msg}` envelope.
    #[error("Request rejected (err {code}): {message}")]
    Business { code: i64, message: String },

    /// A file download came back as a JSON error envelope.
    #[error("Download failed: {message}")]
    Decode { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Local ───────────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No base URL configured for the requested environment/gateway pair.
    #[error("Unknown gateway '{gateway}' for environment '{environment}'")]
    UnknownGateway {
        environment: String,
        gateway: String,
    },

    /// The request could not be built (bad header value, wrong response type).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Persisted session storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Classify this error into the request failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Status { .. } | Self::Cancelled => ErrorKind::Network,
            Self::SessionExpired { .. } | Self::NotAuthenticated => ErrorKind::SessionExpired,
            Self::Business { .. } => ErrorKind::Business,
            Self::Decode { .. } | Self::Deserialization { .. } => ErrorKind::Decode,
            Self::InvalidUrl(_)
            | Self::UnknownGateway { .. }
            | Self::InvalidRequest(_)
            | Self::Tls(_)
            | Self::Storage(_) => ErrorKind::Local,
        }
    }

    /// Returns `true` if the session is gone and a fresh login is required.
    pub fn is_session_expired(&self) -> bool {
        self.kind() == ErrorKind::SessionExpired
    }

    /// Returns `true` for failures a background poll can shrug off.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::Cancelled => true,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired {
                cause: ExpiryCause::Unauthorized,
                ..
            } => Some(401),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let business = Error::Business {
            code: 1001,
            message: "duplicate account".into(),
        };
        assert_eq!(business.kind(), ErrorKind::Business);

        let expired = Error::SessionExpired {
            cause: ExpiryCause::SessionInvalid { code: 401 },
            message: String::new(),
        };
        assert!(expired.is_session_expired());

        let decode = Error::Decode {
            message: "no such file".into(),
        };
        assert_eq!(decode.kind(), ErrorKind::Decode);

        assert_eq!(Error::Cancelled.kind(), ErrorKind::Network);
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 503,
            message: "Service Unavailable".into(),
            body: String::new(),
        };
        assert!(err.is_transient());

        let err = Error::Status {
            status: 404,
            message: "Not Found".into(),
            body: String::new(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn unauthorized_reports_401() {
        let err = Error::SessionExpired {
            cause: ExpiryCause::Unauthorized,
            message: String::new(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Session expired (HTTP 401) -- log in again");
    }
}
