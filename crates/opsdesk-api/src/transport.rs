// ── Console transport ──
//
// One `reqwest::Client` serves every gateway of a routing table, so TLS
// trust and the per-request timeout are decided once per console. Staging
// gateways often run self-signed certificates; deployments with a private
// CA pin it with `ca_cert`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// How gateway certificates are checked.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    #[default]
    System,
    /// Trust the PEM bundle at this path in addition to the system roots.
    CustomCa(PathBuf),
    /// Skip verification (`--insecure`).
    DangerAcceptInvalid,
}

/// Settings shared by every request a console client sends.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request limit; an expired one surfaces as a timeout toast.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            user_agent: concat!("opsdesk/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str());

        let builder = match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("cannot read gateway CA {}: {e}", path.display()))
                })?;
                let ca = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    Error::Tls(format!("gateway CA {} is not PEM: {e}", path.display()))
                })?;
                builder.add_root_certificate(ca)
            }
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        builder
            .build()
            .map_err(|e| Error::Tls(format!("console HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_bundle_is_a_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/opsdesk-ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.build_client().unwrap_err();
        match err {
            Error::Tls(message) => assert!(message.contains("opsdesk-ca.pem"), "{message}"),
            other => panic!("expected Tls, got {other:?}"),
        }
    }

    #[test]
    fn default_and_insecure_modes_build() {
        TransportConfig::default().build_client().unwrap();
        TransportConfig {
            tls: TlsMode::DangerAcceptInvalid,
            ..TransportConfig::default()
        }
        .build_client()
        .unwrap();
    }
}
