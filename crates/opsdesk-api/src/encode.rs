// ── Parameter bag encoding ──
//
// GET, HEAD and DELETE always go out as query parameters. Otherwise the
// content type picks the body encoding.

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::options::ContentType;

/// The parameter bag handed to every request.
pub type Params = Map<String, Value>;

/// Wire form of a parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedBody {
    Query(Vec<(String, String)>),
    Json(Value),
    Form(String),
    Multipart(Vec<(String, String)>),
}

/// Serialize any object-shaped value into a parameter bag.
pub fn params_from<T: Serialize + ?Sized>(value: &T) -> Result<Params, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Params::new()),
        Ok(other) => Err(Error::InvalidRequest(format!(
            "request parameters must be an object, got {other}"
        ))),
        Err(e) => Err(Error::InvalidRequest(format!(
            "unserializable request parameters: {e}"
        ))),
    }
}

/// Encode `params` for the given verb and content type.
pub fn encode_params(method: &Method, content_type: ContentType, params: &Params) -> EncodedBody {
    if [Method::GET, Method::HEAD, Method::DELETE].contains(method) {
        return EncodedBody::Query(flatten(params));
    }

    match content_type {
        ContentType::FormUrlEncoded => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(flatten(params))
                .finish();
            EncodedBody::Form(encoded)
        }
        ContentType::Multipart => EncodedBody::Multipart(flatten(params)),
        ContentType::Json => EncodedBody::Json(Value::Object(params.clone())),
    }
}

/// Flatten a parameter bag into string pairs.
///
/// `null` entries are dropped; nested arrays and objects are JSON-encoded.
fn flatten(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                    value.to_string()
                }
            };
            Some((key.clone(), text))
        })
        .collect()
}

impl EncodedBody {
    /// Attach this body to a request builder.
    pub(crate) fn apply(self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Query(pairs) if pairs.is_empty() => builder,
            Self::Query(pairs) => builder.query(&pairs),
            Self::Json(value) => builder.json(&value),
            Self::Form(encoded) => builder
                .header(
                    reqwest::header::CONTENT_TYPE,
                    ContentType::FormUrlEncoded.mime(),
                )
                .body(encoded),
            Self::Multipart(parts) => {
                let form = parts
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (key, value)| {
                        form.text(key, value)
                    });
                builder.multipart(form)
            }
        }
    }
}
