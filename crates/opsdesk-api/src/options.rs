// ── Per-request options ──
//
// Every recognized option is a field with a fixed default, so call sites
// only spell out what they change.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Side-effect hook invoked on every failure path of a request.
pub type FailureHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Expected body shape of a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// `{err, msg, res}` envelope.
    #[default]
    Json,
    /// Raw file bytes. A JSON body here is an embedded error envelope.
    Blob,
}

/// How the parameter bag is encoded for non-GET requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    FormUrlEncoded,
    Multipart,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
        }
    }
}

/// Options recognized by [`ApiClient`](crate::ApiClient) for a single call.
///
/// | option          | default                                |
/// |-----------------|----------------------------------------|
/// | `show_loading`  | `false`                                |
/// | `show_toast`    | `true`                                 |
/// | `method`        | `GET`                                  |
/// | `response_type` | [`ResponseType::Json`]                 |
/// | `content_type`  | [`ContentType::Json`]                  |
/// | `gateway`       | the client's default gateway           |
/// | `on_failure`    | none                                   |
/// | `cancel`        | child token of the current session scope |
#[derive(Clone)]
pub struct RequestOptions {
    pub show_loading: bool,
    pub show_toast: bool,
    pub method: Method,
    pub response_type: ResponseType,
    pub content_type: ContentType,
    pub gateway: Option<String>,
    pub on_failure: Option<FailureHook>,
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            show_loading: false,
            show_toast: true,
            method: Method::GET,
            response_type: ResponseType::Json,
            content_type: ContentType::Json,
            gateway: None,
            on_failure: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("show_loading", &self.show_loading)
            .field("show_toast", &self.show_toast)
            .field("method", &self.method)
            .field("response_type", &self.response_type)
            .field("content_type", &self.content_type)
            .field("gateway", &self.gateway)
            .field("on_failure", &self.on_failure.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Bracket the call with the global loading indicator.
    pub fn with_loading(mut self) -> Self {
        self.show_loading = true;
        self
    }

    /// Do not surface failures as toasts.
    pub fn quiet(mut self) -> Self {
        self.show_toast = false;
        self
    }

    pub fn form(mut self) -> Self {
        self.content_type = ContentType::FormUrlEncoded;
        self
    }

    pub fn multipart(mut self) -> Self {
        self.content_type = ContentType::Multipart;
        self
    }

    pub fn blob(mut self) -> Self {
        self.response_type = ResponseType::Blob;
        self
    }

    pub fn gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    pub fn on_failure(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Use an explicit cancellation token instead of the session scope's.
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
