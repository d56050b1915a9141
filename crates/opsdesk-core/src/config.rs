// ── Runtime console configuration ──
//
// These types describe how to reach the console and how the alarm watch
// paces itself. They never touch disk: the CLI builds them from its
// config file and hands them in.

use std::time::Duration;

use opsdesk_api::{
    ClientConfig, DEFAULT_LOGOUT_DELAY, DEFAULT_SESSION_INVALID_CODES, Routing, TlsMode,
    TransportConfig,
};

/// Everything needed to build the request client.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub routing: Routing,
    /// Gateway for requests that do not pick one.
    pub default_gateway: String,
    /// Envelope `err` codes that mean the session is gone.
    pub session_invalid_codes: Vec<i64>,
    pub logout_delay: Duration,
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl ConsoleConfig {
    pub fn new(routing: Routing) -> Self {
        Self {
            routing,
            default_gateway: opsdesk_api::routing::DEFAULT_GATEWAY.to_owned(),
            session_invalid_codes: DEFAULT_SESSION_INVALID_CODES.to_vec(),
            logout_delay: DEFAULT_LOGOUT_DELAY,
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            routing: self.routing.clone(),
            default_gateway: self.default_gateway.clone(),
            session_invalid_codes: self.session_invalid_codes.clone(),
            logout_delay: self.logout_delay,
            transport: TransportConfig {
                tls: self.tls.clone(),
                timeout: self.timeout,
                ..TransportConfig::default()
            },
        }
    }
}

/// Pacing of the three alarm-watch timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Dashboard snapshot poll.
    pub poll_interval: Duration,
    /// Audible pulse while alerting.
    pub pulse_interval: Duration,
    /// Indicator frame flip.
    pub flip_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            pulse_interval: Duration::from_millis(1000),
            flip_interval: Duration::from_millis(300),
        }
    }
}
