// ── Alarm classification ──
//
// Pure functions over an alarm set and the last-clear baseline, plus the
// persisted form of that baseline.

use chrono::{DateTime, Utc};
use opsdesk_api::KvStore;
use opsdesk_api::models::AlarmDevice;
use opsdesk_api::storage::keys;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Whether an alarm arrived after the last clear.
///
/// Alarms without a timestamp, and every alarm when nothing was ever
/// cleared, count as new.
pub fn is_new(alarm: &AlarmDevice, baseline: Option<DateTime<Utc>>) -> bool {
    match (alarm.alarm_at, baseline) {
        (Some(at), Some(cleared)) => at > cleared,
        _ => true,
    }
}

/// Number of alarms that arrived after `baseline`.
pub fn unacknowledged_count(alarms: &[AlarmDevice], baseline: Option<DateTime<Utc>>) -> usize {
    alarms.iter().filter(|a| is_new(a, baseline)).count()
}

/// An alarm set split around the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlarmSummary {
    pub new: Vec<AlarmDevice>,
    pub historical: Vec<AlarmDevice>,
}

impl AlarmSummary {
    pub fn classify(alarms: &[AlarmDevice], baseline: Option<DateTime<Utc>>) -> Self {
        let (new, historical) = alarms.iter().cloned().partition(|a| is_new(a, baseline));
        Self { new, historical }
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.historical.is_empty()
    }
}

// ── Indicator ────────────────────────────────────────────────────────

/// Visual alarm indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Indicator {
    /// At least one new alarm.
    FlashingRed,
    /// Only historical alarms.
    SteadyRed,
    /// No alarms at all.
    SteadyGreen,
}

impl Indicator {
    pub fn derive(has_new: bool, has_historical_only: bool) -> Self {
        if has_new {
            Self::FlashingRed
        } else if has_historical_only {
            Self::SteadyRed
        } else {
            Self::SteadyGreen
        }
    }

    pub fn flashes(self) -> bool {
        self == Self::FlashingRed
    }
}

/// What the indicator shows on one flip tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorFrame {
    pub indicator: Indicator,
    pub visible: bool,
}

impl IndicatorFrame {
    pub fn steady(indicator: Indicator) -> Self {
        Self {
            indicator,
            visible: true,
        }
    }

    /// The frame after this one for `indicator`. Flashing alternates
    /// visibility; steady indicators are always shown.
    pub fn next(self, indicator: Indicator) -> Self {
        if indicator.flashes() {
            Self {
                indicator,
                visible: !(self.indicator == indicator && self.visible),
            }
        } else {
            Self::steady(indicator)
        }
    }
}

// ── Persisted baseline ───────────────────────────────────────────────

/// The stored last-clear time, if any.
pub fn load_baseline(store: &dyn KvStore) -> Option<DateTime<Utc>> {
    let raw = store.get(keys::LAST_ALARM_CLEAR)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            warn!(error = %e, raw, "ignoring unreadable alarm baseline");
            None
        }
    }
}

/// Move the stored baseline forward to `to`. An earlier `to` leaves the
/// stored value in place. Returns the baseline now in effect.
pub fn advance_baseline(
    store: &dyn KvStore,
    to: DateTime<Utc>,
) -> Result<DateTime<Utc>, CoreError> {
    let effective = match load_baseline(store) {
        Some(current) if current >= to => return Ok(current),
        _ => to,
    };
    store.set(keys::LAST_ALARM_CLEAR, effective.to_rfc3339())?;
    debug!(baseline = %effective, "alarm baseline advanced");
    Ok(effective)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use opsdesk_api::MemoryStore;
    use opsdesk_api::models::AlarmItem;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn alarm(id: &str, alarm_at: Option<&str>) -> AlarmDevice {
        AlarmDevice {
            device_id: id.into(),
            device_name: format!("device {id}"),
            device_type_group: "pump".into(),
            alarm_item: AlarmItem::default(),
            alarm_at: alarm_at.map(at),
        }
    }

    #[test]
    fn counts_only_alarms_after_the_baseline() {
        let alarms = [
            alarm("1", Some("2025-01-01T00:00:00Z")),
            alarm("2", Some("2025-01-02T00:00:00Z")),
        ];
        let baseline = Some(at("2025-01-01T12:00:00Z"));
        assert_eq!(unacknowledged_count(&alarms, baseline), 1);
    }

    #[test]
    fn no_baseline_counts_everything() {
        let alarms = [alarm("1", Some("2025-01-01T00:00:00Z")), alarm("2", None)];
        assert_eq!(unacknowledged_count(&alarms, None), 2);
    }

    #[test]
    fn equal_timestamp_is_historical() {
        let alarms = [alarm("1", Some("2025-01-01T00:00:00Z"))];
        assert_eq!(
            unacknowledged_count(&alarms, Some(at("2025-01-01T00:00:00Z"))),
            0
        );
    }

    #[test]
    fn undated_alarms_are_always_new() {
        let alarms = [alarm("1", None)];
        let summary = AlarmSummary::classify(&alarms, Some(Utc::now()));
        assert_eq!(summary.new.len(), 1);
        assert!(summary.historical.is_empty());
    }

    #[test]
    fn indicator_truth_table() {
        assert_eq!(Indicator::derive(true, false), Indicator::FlashingRed);
        assert_eq!(Indicator::derive(false, true), Indicator::SteadyRed);
        assert_eq!(Indicator::derive(false, false), Indicator::SteadyGreen);
        assert_eq!(Indicator::FlashingRed.to_string(), "flashing-red");
    }

    #[test]
    fn flashing_alternates_visibility() {
        let frame = IndicatorFrame::steady(Indicator::SteadyGreen);
        let a = frame.next(Indicator::FlashingRed);
        let b = a.next(Indicator::FlashingRed);
        let c = b.next(Indicator::FlashingRed);
        assert_ne!(a.visible, b.visible);
        assert_eq!(a.visible, c.visible);
        assert!(b.next(Indicator::SteadyRed).visible);
    }

    #[test]
    fn baseline_only_moves_forward() {
        let store = MemoryStore::new();
        assert!(load_baseline(&store).is_none());

        let later = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        assert_eq!(advance_baseline(&store, later).unwrap(), later);
        assert_eq!(advance_baseline(&store, earlier).unwrap(), later);
        assert_eq!(load_baseline(&store), Some(later));
    }
}
