// Wire types for the console API.
//
// Field names follow the server's snake_case JSON. Most fields are
// optional or defaulted: the backend omits empty values freely.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::session::UserInfo;

// ── Auth ────────────────────────────────────────────────────────────

/// Body of a successful login or token refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    /// Seconds until the token should be refreshed.
    #[serde(default)]
    pub refresh_in: Option<i64>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

// ── Paging ──────────────────────────────────────────────────────────

/// A page of list results.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

// ── Admins ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Admin {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating an admin account.
#[derive(Debug, Clone, Serialize)]
pub struct NewAdmin {
    pub account: String,
    pub name: String,
    pub role: String,
    pub password: String,
}

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Device {
    #[serde(deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub device_type_group: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub maintaining: bool,
    #[serde(default)]
    pub online: bool,
    /// Fields this client does not model, kept so a save round-trips them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceType {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// Filters for the device list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

// ── Dashboard ───────────────────────────────────────────────────────

/// What the alarm is about and what to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlarmItem {
    #[serde(default)]
    pub config_type_name: String,
    #[serde(default)]
    pub suggested_action: String,
}

/// A device currently in alarm.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlarmDevice {
    #[serde(deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub device_type_group: String,
    #[serde(default)]
    pub alarm_item: AlarmItem,
    /// `None` when absent or unparseable; such alarms always count as new.
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub alarm_at: Option<DateTime<Utc>>,
}

/// One dashboard poll: the full alarm set plus device counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub alarm_devices: Vec<AlarmDevice>,
    #[serde(default)]
    pub device_total: u64,
    #[serde(default)]
    pub online_total: u64,
    #[serde(default)]
    pub offline_total: u64,
    #[serde(default)]
    pub maintaining_total: u64,
}

// ── Topology ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub links: Vec<TopologyLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopologyNode {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopologyLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

// ── System config ───────────────────────────────────────────────────

/// System configuration. The field set varies by deployment, so it stays
/// a loose JSON object.
pub type SystemConfig = Map<String, Value>;

// ── Serde helpers ───────────────────────────────────────────────────

/// Accept ids sent either as strings or as numbers.
fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub mod timestamp {
    //! Lenient timestamp parsing: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC),
    //! or epoch milliseconds. Anything else reads as `None`.

    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Utc, Value};

    const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
                    .ok()
                    .map(|n| n.and_utc())
            })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(de)?;
        Ok(match value {
            Some(Value::String(s)) => parse(&s),
            Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        })
    }
}
