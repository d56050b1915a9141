// opsdesk-api: async request client for the opsdesk management console

pub mod client;
pub mod encode;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod feedback;
mod logout;
pub mod models;
pub mod options;
pub mod routing;
pub mod scope;
pub mod session;
pub mod storage;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder, ClientConfig, DEFAULT_SESSION_INVALID_CODES};
pub use encode::{EncodedBody, Params, encode_params, params_from};
pub use endpoints::Credentials;
pub use envelope::{Envelope, Verdict, classify};
pub use error::{Error, ErrorKind, ExpiryCause};
pub use feedback::{Feedback, LoginRedirect, TracingFeedback};
pub use logout::DEFAULT_LOGOUT_DELAY;
pub use options::{ContentType, FailureHook, RequestOptions, ResponseType};
pub use routing::{GatewayTable, GatewayTarget, Routing};
pub use scope::{SessionScope, SessionScopes};
pub use session::{Session, SessionStore, UserInfo};
pub use storage::{FileStore, KvStore, MemoryStore, StorageError};
pub use transport::{TlsMode, TransportConfig};
