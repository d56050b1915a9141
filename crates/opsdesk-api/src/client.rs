// Console API request client
//
// Wraps `reqwest::Client` with gateway routing, bearer-token injection,
// envelope unwrapping, and session-loss handling. Endpoint methods live
// in `endpoints/` as inherent methods so this module stays about
// transport mechanics.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::encode::{Params, encode_params};
use crate::envelope::{self, Envelope, ErrorEnvelope, classify};
use crate::error::{Error, ExpiryCause};
use crate::feedback::{Feedback, LoadingGuard, LoginRedirect, TracingFeedback};
use crate::logout::{DEFAULT_LOGOUT_DELAY, ForcedLogout};
use crate::options::{RequestOptions, ResponseType};
use crate::routing::{DEFAULT_GATEWAY, Routing};
use crate::scope::SessionScopes;
use crate::session::SessionStore;
use crate::storage::{KvStore, MemoryStore};
use crate::transport::TransportConfig;

/// `err` values that mean "session invalid" unless configured otherwise.
pub const DEFAULT_SESSION_INVALID_CODES: &[i64] = &[401];

const NETWORK_ERROR_TOAST: &str = "Network error, please try again later";
const GENERIC_ERROR_TOAST: &str = "Request failed";

/// Static configuration of an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub routing: Routing,
    /// Gateway used when a request does not name one.
    pub default_gateway: String,
    /// Envelope `err` codes that force a logout.
    pub session_invalid_codes: Vec<i64>,
    /// Delay before the login redirect of a forced logout.
    pub logout_delay: Duration,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(routing: Routing) -> Self {
        Self {
            routing,
            default_gateway: DEFAULT_GATEWAY.to_owned(),
            session_invalid_codes: DEFAULT_SESSION_INVALID_CODES.to_vec(),
            logout_delay: DEFAULT_LOGOUT_DELAY,
            transport: TransportConfig::default(),
        }
    }
}

/// What a successful call produced.
#[derive(Debug)]
enum Payload {
    Envelope(Envelope<Value>),
    Blob(Bytes),
}

/// Async client for the console API.
///
/// Cheaply cloneable; clones share the HTTP pool, session storage,
/// cancellation scopes, and the forced-logout state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    sessions: SessionStore,
    scopes: Arc<SessionScopes>,
    logout: ForcedLogout,
    feedback: Arc<dyn Feedback>,
    /// Location reported to the login redirect as the return target.
    location: RwLock<Option<String>>,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    store: Option<Arc<dyn KvStore>>,
    feedback: Option<Arc<dyn Feedback>>,
    redirect: Option<Arc<dyn LoginRedirect>>,
}

impl ApiClientBuilder {
    /// Use a pre-built `reqwest::Client` instead of one from the
    /// transport config.
    pub fn http(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Persisted storage for the session (defaults to in-memory).
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn build(self) -> Result<ApiClient, Error> {
        let http = match self.http {
            Some(http) => http,
            None => self.config.transport.build_client()?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KvStore>);
        let sessions = SessionStore::new(store);
        let scopes = Arc::new(SessionScopes::new());
        let redirect = self
            .redirect
            .unwrap_or_else(|| Arc::new(TracingFeedback) as Arc<dyn LoginRedirect>);
        let logout = ForcedLogout::new(
            Arc::clone(&scopes),
            sessions.clone(),
            redirect,
            self.config.logout_delay,
        );
        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                config: self.config,
                sessions,
                scopes,
                logout,
                feedback: self
                    .feedback
                    .unwrap_or_else(|| Arc::new(TracingFeedback) as Arc<dyn Feedback>),
                location: RwLock::new(None),
            }),
        })
    }
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            http: None,
            store: None,
            feedback: None,
            redirect: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Persisted session state.
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// The storage shared by the session and other persisted keys.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        self.inner.sessions.kv()
    }

    /// Cancellation scopes for in-flight requests.
    pub fn scopes(&self) -> &Arc<SessionScopes> {
        &self.inner.scopes
    }

    /// Record where the user currently is, for the post-login return.
    pub fn set_location(&self, location: Option<String>) {
        *self.inner.location.write().expect("location lock poisoned") = location;
    }

    fn location(&self) -> Option<String> {
        self.inner
            .location
            .read()
            .expect("location lock poisoned")
            .clone()
    }

    /// Whether a forced logout is waiting to redirect.
    pub fn logout_pending(&self) -> bool {
        self.inner.logout.is_pending()
    }

    /// Wait until a pending forced logout has redirected.
    pub async fn wait_logout(&self) {
        self.inner.logout.settled().await;
    }

    // ── Public request API ───────────────────────────────────────────

    /// Perform a call and return the validated envelope (`err == 0`).
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<Envelope<T>, Error> {
        self.run(opts, async {
            match self.execute(path, params, opts).await? {
                Payload::Envelope(env) => env.typed(),
                Payload::Blob(_) => Err(Error::InvalidRequest(
                    "request() expects a JSON envelope; use download() for files".into(),
                )),
            }
        })
        .await
    }

    /// Perform a call and return the envelope's `res`, failing if absent.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<T, Error> {
        self.request(path, params, opts)
            .await?
            .into_res()
            .ok_or_else(|| Error::Deserialization {
                message: format!("response to {path} carried no `res` payload"),
                body: String::new(),
            })
    }

    /// Perform a call whose `res` may legitimately be absent.
    pub async fn fetch_opt<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<Option<T>, Error> {
        Ok(self.request(path, params, opts).await?.into_res())
    }

    /// Perform a call whose payload, if any, is not needed.
    pub async fn call(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<(), Error> {
        self.request::<serde::de::IgnoredAny>(path, params, opts)
            .await
            .map(|_| ())
    }

    /// Download a file. A JSON body is read as an error envelope.
    pub async fn download(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<Bytes, Error> {
        let opts = opts.clone().blob();
        self.run(&opts, async {
            match self.execute(path, params, &opts).await? {
                Payload::Blob(bytes) => Ok(bytes),
                Payload::Envelope(_) => Err(Error::InvalidRequest(
                    "download() received a JSON envelope".into(),
                )),
            }
        })
        .await
    }

    /// POST `params` as multipart text parts.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
    ) -> Result<Option<T>, Error> {
        self.fetch_opt(path, params, &RequestOptions::post().multipart().with_loading())
            .await
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    /// Loading indicator around the call, failure reporting after it.
    async fn run<T>(
        &self,
        opts: &RequestOptions,
        call: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        let _loading = opts
            .show_loading
            .then(|| LoadingGuard::start(Arc::clone(&self.inner.feedback)));
        let result = call.await;
        if let Err(ref e) = result {
            self.report_failure(e, opts);
        }
        result
    }

    async fn execute(
        &self,
        path: &str,
        params: &Params,
        opts: &RequestOptions,
    ) -> Result<Payload, Error> {
        let gateway = opts
            .gateway
            .as_deref()
            .unwrap_or(&self.inner.config.default_gateway);
        let target = self.inner.config.routing.resolve(path, gateway)?;
        let cancel = opts
            .cancel
            .clone()
            .unwrap_or_else(|| self.inner.scopes.current().request_token());

        let token = match target.auth_override {
            Some(token) => Some(token.clone()),
            None => self.inner.sessions.access_token(),
        };

        debug!(method = %opts.method, url = %target.url, "sending request");

        let mut builder = self
            .inner
            .http
            .request(opts.method.clone(), target.url.clone());
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer(&token)?);
        }
        let builder = encode_params(&opts.method, opts.content_type, params).apply(builder);

        let resp = cancellable(&cancel, builder.send()).await??;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.force_logout(ExpiryCause::Unauthorized);
            return Err(Error::SessionExpired {
                cause: ExpiryCause::Unauthorized,
                message: String::new(),
            });
        }

        if !status.is_success() {
            let body = cancellable(&cancel, resp.text())
                .await?
                .unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or(GENERIC_ERROR_TOAST)
                    .to_owned(),
                body,
            });
        }

        match opts.response_type {
            ResponseType::Blob => self.read_blob(resp, &cancel).await.map(Payload::Blob),
            ResponseType::Json => {
                let body = cancellable(&cancel, resp.text()).await??;
                trace!(bytes = body.len(), "response body received");
                let env = envelope::parse(&body)?;
                let verdict = classify(env.err, &env.msg, &self.inner.config.session_invalid_codes);
                match verdict.into_error() {
                    None => Ok(Payload::Envelope(env)),
                    Some(err) => {
                        if let Error::SessionExpired { cause, .. } = err {
                            self.force_logout(cause);
                        }
                        Err(err)
                    }
                }
            }
        }
    }

    /// Read a file body, treating an unexpected JSON content type as an
    /// embedded error envelope.
    async fn read_blob(
        &self,
        resp: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<Bytes, Error> {
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        if is_json {
            let text = cancellable(cancel, resp.text()).await??;
            let embedded: ErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
            let message = embedded.msg.unwrap_or_else(|| match embedded.err {
                Some(code) => format!("download failed with err {code}"),
                None => "unexpected JSON response to a file download".to_owned(),
            });
            return Err(Error::Decode { message });
        }

        Ok(cancellable(cancel, resp.bytes()).await??)
    }

    fn force_logout(&self, cause: ExpiryCause) {
        self.inner.logout.trigger(cause, self.location());
    }

    /// Toast and failure hook for a failed call.
    fn report_failure(&self, err: &Error, opts: &RequestOptions) {
        if opts.show_toast {
            if let Some(message) = toast_message(err) {
                self.inner.feedback.toast(&message);
            }
        }
        if let Some(ref hook) = opts.on_failure {
            hook(err);
        }
    }
}

/// Text surfaced to the user for a failure, if it deserves a toast.
fn toast_message(err: &Error) -> Option<String> {
    match err {
        Error::Cancelled => None,
        Error::SessionExpired {
            cause: ExpiryCause::Unauthorized,
            ..
        } => None,
        Error::SessionExpired { message, .. } => {
            Some(if message.is_empty() {
                "Session expired, please log in again".to_owned()
            } else {
                message.clone()
            })
        }
        Error::Transport(_) => Some(NETWORK_ERROR_TOAST.to_owned()),
        Error::Status { message, .. } => Some(message.clone()),
        Error::Business { message, .. } | Error::Decode { message } => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn bearer(token: &secrecy::SecretString) -> Result<HeaderValue, Error> {
    use secrecy::ExposeSecret;
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| Error::InvalidRequest(format!("invalid token header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Race a future against a cancellation token.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, Error> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}
