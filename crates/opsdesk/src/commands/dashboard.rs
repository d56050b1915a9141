//! Dashboard totals.

use opsdesk_api::models::DashboardSnapshot;
use opsdesk_core::Console;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(s: &DashboardSnapshot) -> String {
    [
        format!("Devices:      {}", s.device_total),
        format!("Online:       {}", s.online_total),
        format!("Offline:      {}", s.offline_total),
        format!("Maintaining:  {}", s.maintaining_total),
        format!("Alarms:       {}", s.alarm_devices.len()),
    ]
    .join("\n")
}

pub async fn handle(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = console.client().dashboard_snapshot().await?;
    let out = output::render_single(global.format(), &snapshot, detail, |s| {
        s.alarm_devices.len().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
