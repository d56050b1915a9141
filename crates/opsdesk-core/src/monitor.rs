// ── Alarm monitor state machine ──
//
// Holds the latest dashboard snapshot, the last-clear baseline, and the
// alert-enabled flag. Every mutator returns the events it caused so the
// caller decides what to log or render.

use chrono::{DateTime, Utc};
use opsdesk_api::models::DashboardSnapshot;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::alarm::{AlarmSummary, Indicator, unacknowledged_count};

/// Audible/visual alert state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AlertState {
    /// Alerting disabled.
    Idle,
    /// Enabled with unacknowledged alarms: pulse and flash.
    AlertingActive,
    /// Enabled with nothing unacknowledged: silent, steady indicator.
    AlertingArmed,
}

/// Something a transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The first snapshot arrived.
    Loaded,
    StateChanged { from: AlertState, to: AlertState },
    /// Every known alarm was marked seen; `baseline` is now in effect.
    Acknowledged { baseline: DateTime<Utc> },
    /// A newer baseline written elsewhere was picked up.
    BaselineAdopted { baseline: DateTime<Utc> },
}

#[derive(Debug, Clone, Default)]
pub struct AlarmMonitor {
    snapshot: Option<DashboardSnapshot>,
    baseline: Option<DateTime<Utc>>,
    alert_enabled: bool,
    unacknowledged: usize,
    /// The current snapshot was cleared as a whole. Undated alarms in it
    /// stay acknowledged until the next snapshot replaces it.
    acknowledged: bool,
    consecutive_failures: u32,
}

impl AlarmMonitor {
    pub fn new(baseline: Option<DateTime<Utc>>, alert_enabled: bool) -> Self {
        Self {
            baseline,
            alert_enabled,
            ..Self::default()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn baseline(&self) -> Option<DateTime<Utc>> {
        self.baseline
    }

    pub fn alert_enabled(&self) -> bool {
        self.alert_enabled
    }

    /// True until the first snapshot has loaded. Later polls never set it
    /// again.
    pub fn is_loading(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn unacknowledged(&self) -> usize {
        self.unacknowledged
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn state(&self) -> AlertState {
        if !self.alert_enabled {
            AlertState::Idle
        } else if self.unacknowledged > 0 {
            AlertState::AlertingActive
        } else {
            AlertState::AlertingArmed
        }
    }

    /// Alarms of the current snapshot split around the baseline.
    pub fn summary(&self) -> AlarmSummary {
        let alarms = self
            .snapshot
            .as_ref()
            .map_or(&[][..], |s| s.alarm_devices.as_slice());
        if self.acknowledged {
            AlarmSummary {
                new: Vec::new(),
                historical: alarms.to_vec(),
            }
        } else {
            AlarmSummary::classify(alarms, self.baseline)
        }
    }

    pub fn indicator(&self) -> Indicator {
        let total = self
            .snapshot
            .as_ref()
            .map_or(0, |s| s.alarm_devices.len());
        Indicator::derive(self.unacknowledged > 0, total > self.unacknowledged)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Replace the snapshot wholesale and recount.
    pub fn apply_snapshot(&mut self, snapshot: DashboardSnapshot) -> Vec<MonitorEvent> {
        let before = self.state();
        let first = self.snapshot.is_none();
        self.snapshot = Some(snapshot);
        self.acknowledged = false;
        self.consecutive_failures = 0;
        self.recount();

        let mut events = Vec::new();
        if first {
            events.push(MonitorEvent::Loaded);
        }
        self.push_transition(before, &mut events);
        events
    }

    /// A poll failed. The previous snapshot and state are kept.
    pub fn poll_failed(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn set_alert_enabled(&mut self, enabled: bool) -> Vec<MonitorEvent> {
        let before = self.state();
        self.alert_enabled = enabled;
        let mut events = Vec::new();
        self.push_transition(before, &mut events);
        events
    }

    /// Mark everything currently known as seen.
    ///
    /// The baseline becomes `now` unless it is already later. Persisting
    /// it is the caller's job.
    pub fn clear(&mut self, now: DateTime<Utc>) -> Vec<MonitorEvent> {
        let before = self.state();
        let baseline = self.baseline.map_or(now, |b| b.max(now));
        self.baseline = Some(baseline);
        self.acknowledged = true;
        self.unacknowledged = 0;

        let mut events = vec![MonitorEvent::Acknowledged { baseline }];
        self.push_transition(before, &mut events);
        events
    }

    /// Pick up a baseline stored by someone else. Older values are
    /// ignored.
    pub fn adopt_baseline(&mut self, baseline: DateTime<Utc>) -> Vec<MonitorEvent> {
        if self.baseline.is_some_and(|b| b >= baseline) {
            return Vec::new();
        }
        let before = self.state();
        self.baseline = Some(baseline);
        if !self.acknowledged {
            self.recount();
        }
        let mut events = vec![MonitorEvent::BaselineAdopted { baseline }];
        self.push_transition(before, &mut events);
        events
    }

    fn recount(&mut self) {
        self.unacknowledged = match (&self.snapshot, self.acknowledged) {
            (Some(snapshot), false) => unacknowledged_count(&snapshot.alarm_devices, self.baseline),
            _ => 0,
        };
    }

    fn push_transition(&self, before: AlertState, events: &mut Vec<MonitorEvent>) {
        let after = self.state();
        if before != after {
            events.push(MonitorEvent::StateChanged {
                from: before,
                to: after,
            });
        }
    }
}
