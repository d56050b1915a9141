//! Device command handlers.

use tabled::Tabled;

use opsdesk_api::models::{Device, DeviceQuery, DeviceType};
use opsdesk_core::Console;

use crate::cli::{DeviceFilter, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Maintaining")]
    maintaining: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.device_id.clone(),
            name: d.device_name.clone(),
            group: d.device_type_group.clone().unwrap_or_default(),
            ip: d.ip.clone().unwrap_or_default(),
            location: d.location.clone().unwrap_or_default(),
            online: if d.online { "yes" } else { "no" }.into(),
            maintaining: if d.maintaining { "yes" } else { "no" }.into(),
        }
    }
}

#[derive(Tabled)]
struct DeviceTypeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
}

impl From<&DeviceType> for DeviceTypeRow {
    fn from(t: &DeviceType) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            group: t.group.clone().unwrap_or_default(),
        }
    }
}

fn query(filter: DeviceFilter, page: Option<u32>, page_size: Option<u32>) -> DeviceQuery {
    DeviceQuery {
        keyword: filter.keyword,
        device_type_group: filter.group,
        page,
        page_size,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = console.client();
    match args.command {
        DevicesCommand::List { list, filter } => {
            let page = client
                .list_devices(&query(filter, Some(list.page), Some(list.page_size)))
                .await?;
            let out = output::render_list(
                global.format(),
                &page.list,
                |d| DeviceRow::from(d),
                |d| d.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            if matches!(global.format(), crate::cli::OutputFormat::Table) {
                output::notice(
                    &format!("{} of {} devices", page.list.len(), page.total),
                    global.quiet,
                );
            }
            Ok(())
        }

        DevicesCommand::Save { from_file } => {
            let device: Device = util::read_json_file(&from_file)?;
            client.save_device(&device).await?;
            output::notice(&format!("Device '{}' saved", device.device_id), global.quiet);
            Ok(())
        }

        DevicesCommand::Maintain { device, off } => {
            client.toggle_device_maintaining(&device, !off).await?;
            let state = if off { "out of" } else { "into" };
            output::notice(
                &format!("Device '{device}' moved {state} maintenance"),
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Types => {
            let types = client.list_device_types().await?;
            let out = output::render_list(
                global.format(),
                &types,
                |t| DeviceTypeRow::from(t),
                |t| t.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Export { filter, out } => {
            let bytes = client.export_devices(&query(filter, None, None)).await?;
            std::fs::write(&out, &bytes)?;
            output::notice(
                &format!("Wrote {} bytes to {}", bytes.len(), out.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}
