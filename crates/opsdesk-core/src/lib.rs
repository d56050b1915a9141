// opsdesk-core: alarm monitoring and session services between opsdesk-api
// and front ends.

pub mod alarm;
pub mod config;
pub mod console;
pub mod error;
pub mod monitor;
pub mod scheduler;
pub mod watch;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alarm::{AlarmSummary, Indicator, IndicatorFrame, is_new, unacknowledged_count};
pub use config::{ConsoleConfig, MonitorConfig};
pub use console::Console;
pub use error::CoreError;
pub use monitor::{AlarmMonitor, AlertState, MonitorEvent};
pub use scheduler::{FirstTick, Ticker};
pub use watch::{AlarmView, AlarmWatch, AlertSink, SnapshotSource};
