// ── Alarm watch service ──
//
// Three tickers drive one `AlarmMonitor`: the poll replaces the snapshot,
// the pulse beeps while alerting, and the flip advances the indicator
// frame. They share state only through the `watch` channel, so every tick
// sees a consistent view.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use opsdesk_api::models::DashboardSnapshot;
use opsdesk_api::{ApiClient, KvStore};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::alarm::{IndicatorFrame, advance_baseline, load_baseline};
use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::monitor::{AlarmMonitor, AlertState, MonitorEvent};
use crate::scheduler::{FirstTick, Ticker};

/// Where snapshots come from.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> impl Future<Output = Result<DashboardSnapshot, CoreError>> + Send;
}

impl SnapshotSource for ApiClient {
    async fn snapshot(&self) -> Result<DashboardSnapshot, CoreError> {
        Ok(self.dashboard_snapshot().await?)
    }
}

/// Audible and visual output of the watch.
pub trait AlertSink: Send + Sync + 'static {
    /// One audible pulse.
    fn pulse(&self);
    /// Show one indicator frame.
    fn indicator(&self, frame: IndicatorFrame);
    /// Give back any audio device. Called once when the watch stops.
    fn release(&self);
}

/// What front ends render.
#[derive(Debug, Clone)]
pub struct AlarmView {
    pub monitor: AlarmMonitor,
    pub frame: IndicatorFrame,
    /// Message of the last failed poll, cleared by the next success.
    pub last_error: Option<String>,
    /// A poll hit an expired session. Polling stops until a new watch
    /// starts after login.
    pub session_lost: bool,
}

impl AlarmView {
    fn new(monitor: AlarmMonitor) -> Self {
        let frame = IndicatorFrame::steady(monitor.indicator());
        Self {
            monitor,
            frame,
            last_error: None,
            session_lost: false,
        }
    }
}

/// Running alarm watch. Dropping it stops the tickers and releases the
/// sink.
pub struct AlarmWatch {
    view: Arc<watch::Sender<AlarmView>>,
    store: Arc<dyn KvStore>,
    sink: Arc<dyn AlertSink>,
    tickers: Vec<Ticker>,
    released: bool,
}

impl AlarmWatch {
    /// Start polling `source`, seeded with the baseline persisted in
    /// `store`.
    pub fn start<S: SnapshotSource>(
        source: Arc<S>,
        store: Arc<dyn KvStore>,
        sink: Arc<dyn AlertSink>,
        config: &MonitorConfig,
        alert_enabled: bool,
    ) -> Self {
        let monitor = AlarmMonitor::new(load_baseline(store.as_ref()), alert_enabled);
        let (view, _) = watch::channel(AlarmView::new(monitor));
        let view = Arc::new(view);

        let poll = {
            let view = Arc::clone(&view);
            let store = Arc::clone(&store);
            Ticker::start("poll", config.poll_interval, FirstTick::Immediate, move || {
                poll_once(Arc::clone(&source), Arc::clone(&store), Arc::clone(&view))
            })
        };

        let pulse = {
            let view = Arc::clone(&view);
            let sink = Arc::clone(&sink);
            Ticker::start(
                "pulse",
                config.pulse_interval,
                FirstTick::AfterPeriod,
                move || {
                    if view.borrow().monitor.state() == AlertState::AlertingActive {
                        sink.pulse();
                    }
                    std::future::ready(())
                },
            )
        };

        let flip = {
            let view = Arc::clone(&view);
            let sink = Arc::clone(&sink);
            Ticker::start(
                "flip",
                config.flip_interval,
                FirstTick::AfterPeriod,
                move || {
                    let mut frame = None;
                    view.send_modify(|v| {
                        v.frame = v.frame.next(v.monitor.indicator());
                        frame = Some(v.frame);
                    });
                    if let Some(frame) = frame {
                        sink.indicator(frame);
                    }
                    std::future::ready(())
                },
            )
        };

        info!(?config, alert_enabled, "alarm watch started");
        Self {
            view,
            store,
            sink,
            tickers: vec![poll, pulse, flip],
            released: false,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AlarmView> {
        self.view.subscribe()
    }

    /// A copy of the current view.
    pub fn view(&self) -> AlarmView {
        self.view.borrow().clone()
    }

    pub fn set_alert_enabled(&self, enabled: bool) {
        self.modify(|m| m.set_alert_enabled(enabled));
    }

    pub fn toggle_alert(&self) -> bool {
        let enabled = !self.view.borrow().monitor.alert_enabled();
        self.set_alert_enabled(enabled);
        enabled
    }

    /// Acknowledge every known alarm and persist the new baseline.
    pub fn clear(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
        self.modify(|m| m.clear(now));
        let baseline = self.view.borrow().monitor.baseline().unwrap_or(now);
        advance_baseline(self.store.as_ref(), baseline)
    }

    /// Stop all tickers and release the sink.
    pub async fn stop(mut self) {
        for ticker in self.tickers.drain(..) {
            ticker.stop().await;
        }
        self.release();
        debug!("alarm watch stopped");
    }

    fn modify(&self, apply: impl FnOnce(&mut AlarmMonitor) -> Vec<MonitorEvent>) {
        let mut events = Vec::new();
        self.view.send_modify(|v| events = apply(&mut v.monitor));
        log_events(&events);
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.sink.release();
        }
    }
}

impl Drop for AlarmWatch {
    fn drop(&mut self) {
        // Ticker::drop cancels each loop.
        self.tickers.clear();
        self.release();
    }
}

/// One poll: fetch, pick up any newer persisted baseline, apply.
async fn poll_once<S: SnapshotSource>(
    source: Arc<S>,
    store: Arc<dyn KvStore>,
    view: Arc<watch::Sender<AlarmView>>,
) {
    if view.borrow().session_lost {
        return;
    }
    let (snapshot, failure) = match source.snapshot().await {
        Ok(snapshot) => (Some(snapshot), None),
        Err(e) => (None, Some(e)),
    };
    let stored = load_baseline(store.as_ref());

    let mut events = Vec::new();
    view.send_modify(|v| {
        if let Some(baseline) = stored {
            events.extend(v.monitor.adopt_baseline(baseline));
        }
        if let Some(snapshot) = snapshot {
            events.extend(v.monitor.apply_snapshot(snapshot));
            v.last_error = None;
        } else {
            v.monitor.poll_failed();
            v.last_error = failure.as_ref().map(ToString::to_string);
            v.session_lost = failure.as_ref().is_some_and(CoreError::needs_login);
        }
    });

    if let Some(e) = failure {
        if e.needs_login() {
            warn!(error = %e, "alarm poll lost the session, polling stopped");
        } else {
            debug!(error = %e, "alarm poll failed");
        }
    }
    log_events(&events);
}

fn log_events(events: &[MonitorEvent]) {
    for event in events {
        match event {
            MonitorEvent::Loaded => debug!("first alarm snapshot loaded"),
            MonitorEvent::StateChanged { from, to } => info!(%from, %to, "alert state changed"),
            MonitorEvent::Acknowledged { baseline } => info!(%baseline, "alarms cleared"),
            MonitorEvent::BaselineAdopted { baseline } => {
                debug!(%baseline, "adopted newer alarm baseline");
            }
        }
    }
}
