// ── Base URL resolution ──
//
// Requests name a service-relative path and a gateway key. In development
// the path is hung off a fixed local prefix; deployed builds look the
// gateway up in a per-environment table.

use std::collections::HashMap;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Path prefix the local development gateway serves the API under.
pub const DEV_GATEWAY_PREFIX: &str = "/api";

/// Gateway key used when a request does not pick one.
pub const DEFAULT_GATEWAY: &str = "default";

/// One deployable backend.
#[derive(Debug, Clone)]
pub struct GatewayTarget {
    pub target: Url,
    /// Pre-configured bearer token; wins over the session token.
    pub auth_token: Option<SecretString>,
}

impl GatewayTarget {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }
}

/// environment name → gateway key → target.
pub type GatewayTable = HashMap<String, HashMap<String, GatewayTarget>>;

/// How logical paths become absolute URLs.
#[derive(Debug, Clone)]
pub enum Routing {
    /// Everything goes to `local_base` + [`DEV_GATEWAY_PREFIX`].
    Development { local_base: Url },
    /// The environment's table decides per gateway.
    Deployed {
        environment: String,
        table: GatewayTable,
    },
}

/// A resolved request target.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub url: Url,
    pub auth_override: Option<&'a SecretString>,
}

impl Routing {
    /// Single-environment table with one default gateway.
    pub fn single(environment: impl Into<String>, target: GatewayTarget) -> Self {
        let environment = environment.into();
        let mut gateways = HashMap::new();
        gateways.insert(DEFAULT_GATEWAY.to_owned(), target);
        let mut table = HashMap::new();
        table.insert(environment.clone(), gateways);
        Self::Deployed { environment, table }
    }

    /// Name of the active environment (`"development"` for local routing).
    pub fn environment(&self) -> &str {
        match self {
            Self::Development { .. } => "development",
            Self::Deployed { environment, .. } => environment,
        }
    }

    /// Resolve a logical path against the given gateway.
    pub fn resolve(&self, path: &str, gateway: &str) -> Result<Resolved<'_>, Error> {
        let path = normalize_path(path);
        match self {
            Self::Development { local_base } => Ok(Resolved {
                url: join(local_base, DEV_GATEWAY_PREFIX, &path)?,
                auth_override: None,
            }),
            Self::Deployed { environment, table } => {
                let target = table
                    .get(environment)
                    .and_then(|gateways| gateways.get(gateway))
                    .ok_or_else(|| Error::UnknownGateway {
                        environment: environment.clone(),
                        gateway: gateway.to_owned(),
                    })?;
                Ok(Resolved {
                    url: join(&target.target, "", &path)?,
                    auth_override: target.auth_token.as_ref(),
                })
            }
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

fn join(base: &Url, prefix: &str, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let prefix = prefix.trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{prefix}{path}"))?)
}
