// ── Console facade ──
//
// Ties the request client, its persisted session, and the alarm watch
// together for front ends. Cheaply cloneable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opsdesk_api::models::DashboardSnapshot;
use opsdesk_api::{
    ApiClient, Credentials, Feedback, KvStore, LoginRedirect, Session, TracingFeedback,
};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::alarm::{AlarmSummary, advance_baseline, load_baseline};
use crate::config::{ConsoleConfig, MonitorConfig};
use crate::error::CoreError;
use crate::watch::{AlarmWatch, AlertSink};

#[derive(Clone)]
pub struct Console {
    client: ApiClient,
}

impl Console {
    /// Build a console over `store` with log-only feedback hooks.
    pub fn new(config: &ConsoleConfig, store: Arc<dyn KvStore>) -> Result<Self, CoreError> {
        Self::with_hooks(
            config,
            store,
            Arc::new(TracingFeedback),
            Arc::new(TracingFeedback),
        )
    }

    pub fn with_hooks(
        config: &ConsoleConfig,
        store: Arc<dyn KvStore>,
        feedback: Arc<dyn Feedback>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, CoreError> {
        let client = ApiClient::builder(config.client_config())
            .store(store)
            .feedback(feedback)
            .redirect(redirect)
            .build()?;
        debug!(environment = config.routing.environment(), "console client ready");
        Ok(Self { client })
    }

    /// Wrap an already-built client.
    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying request client, for resource endpoints.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        self.client.store()
    }

    // ── Session ──────────────────────────────────────────────────────

    pub async fn login(
        &self,
        account: &str,
        password: SecretString,
    ) -> Result<Session, CoreError> {
        let session = self
            .client
            .login(&Credentials {
                account: account.to_owned(),
                password,
            })
            .await?;
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        Ok(self.client.logout()?)
    }

    /// The stored session, if it has not expired.
    pub fn session(&self) -> Option<Session> {
        self.client
            .sessions()
            .load()
            .filter(|s| !s.is_expired(Utc::now()))
    }

    /// The stored session, refreshed first if it is due.
    ///
    /// An expired session is cleared and reported as
    /// [`CoreError::NotAuthenticated`].
    pub async fn ensure_session(&self) -> Result<Session, CoreError> {
        let now = Utc::now();
        let session = self
            .client
            .sessions()
            .load()
            .ok_or(CoreError::NotAuthenticated)?;
        if session.is_expired(now) {
            self.client.sessions().clear()?;
            info!(account = %session.user.account, "stored session expired");
            return Err(CoreError::NotAuthenticated);
        }
        if session.needs_refresh(now) {
            debug!(account = %session.user.account, "session due for refresh");
            return Ok(self.client.refresh_token().await?);
        }
        Ok(session)
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// When alarms were last cleared, from any front end.
    pub fn alarm_baseline(&self) -> Option<DateTime<Utc>> {
        load_baseline(self.store().as_ref())
    }

    /// Mark every alarm up to `now` as seen.
    pub fn clear_alarms(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
        let baseline = advance_baseline(self.store().as_ref(), now)?;
        info!(%baseline, "alarms cleared");
        Ok(baseline)
    }

    /// One snapshot, split around the stored baseline.
    pub async fn alarm_summary(&self) -> Result<(DashboardSnapshot, AlarmSummary), CoreError> {
        let snapshot = self.client.dashboard_snapshot().await?;
        let summary = AlarmSummary::classify(&snapshot.alarm_devices, self.alarm_baseline());
        Ok((snapshot, summary))
    }

    /// Start the background alarm watch.
    pub fn watch_alarms(
        &self,
        sink: Arc<dyn AlertSink>,
        config: &MonitorConfig,
        alert_enabled: bool,
    ) -> AlarmWatch {
        AlarmWatch::start(
            Arc::new(self.client.clone()),
            Arc::clone(self.store()),
            sink,
            config,
            alert_enabled,
        )
    }
}
