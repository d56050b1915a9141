// ── Response envelope ──
//
// Every endpoint answers `{ err, msg, res }`. `err == 0` is success;
// anything else is either a business failure or, for the configured
// sentinel codes, a lost session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ExpiryCause};

/// The `{err, msg, res}` wrapper used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub err: i64,
    #[serde(default)]
    pub msg: String,
    pub res: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.err == 0
    }

    /// Drop the wrapper, keeping only the payload.
    pub fn into_res(self) -> Option<T> {
        self.res
    }
}

impl Envelope<Value> {
    /// Re-type the loosely parsed payload.
    ///
    /// `null` and a missing `res` both become `None`.
    pub fn typed<T: DeserializeOwned>(self) -> Result<Envelope<T>, Error> {
        let res = match self.res {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|e| {
                Error::Deserialization {
                    message: format!("unexpected `res` shape: {e}"),
                    body: raw.to_string(),
                }
            })?),
        };
        Ok(Envelope {
            err: self.err,
            msg: self.msg,
            res,
        })
    }
}

/// How a parsed envelope should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    SessionInvalid { code: i64, message: String },
    Business { code: i64, message: String },
}

/// Classify an envelope's `err`/`msg` pair against the sentinel list.
pub fn classify(err: i64, msg: &str, session_invalid_codes: &[i64]) -> Verdict {
    if err == 0 {
        Verdict::Ok
    } else if session_invalid_codes.contains(&err) {
        Verdict::SessionInvalid {
            code: err,
            message: msg.to_owned(),
        }
    } else {
        let message = if msg.is_empty() {
            format!("err={err}")
        } else {
            msg.to_owned()
        };
        Verdict::Business { code: err, message }
    }
}

impl Verdict {
    /// Turn a non-`Ok` verdict into the matching error.
    pub fn into_error(self) -> Option<Error> {
        match self {
            Self::Ok => None,
            Self::SessionInvalid { code, message } => Some(Error::SessionExpired {
                cause: ExpiryCause::SessionInvalid { code },
                message,
            }),
            Self::Business { code, message } => Some(Error::Business { code, message }),
        }
    }
}

/// Lenient envelope used when a file download unexpectedly returns JSON.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub err: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Parse a JSON body into an untyped envelope.
pub(crate) fn parse(body: &str) -> Result<Envelope<Value>, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}
