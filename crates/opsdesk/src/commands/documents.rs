//! Whole-document resources: topology and system configuration.

use opsdesk_api::models::{SystemConfig, Topology};
use opsdesk_core::Console;

use crate::cli::{DocumentCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

fn topology_detail(t: &Topology) -> String {
    let mut lines = vec![format!("Nodes: {}  Links: {}", t.nodes.len(), t.links.len())];
    for node in &t.nodes {
        lines.push(format!(
            "  {:<12} {:<24} ({:.0}, {:.0}){}",
            node.id,
            node.label,
            node.x,
            node.y,
            node.device_id
                .as_deref()
                .map_or_else(String::new, |d| format!("  device {d}"))
        ));
    }
    for link in &t.links {
        lines.push(format!(
            "  {} -> {}{}",
            link.source,
            link.target,
            link.label
                .as_deref()
                .map_or_else(String::new, |l| format!("  [{l}]"))
        ));
    }
    lines.join("\n")
}

fn system_detail(cfg: &SystemConfig) -> String {
    let mut keys: Vec<_> = cfg.keys().collect();
    keys.sort();
    let width = keys.iter().map(|k| k.len()).max().unwrap_or(0);
    keys.into_iter()
        .map(|k| format!("{k:<width$}  {}", cfg[k]))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn topology(
    console: &Console,
    command: DocumentCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = console.client();
    match command {
        DocumentCommand::Get => {
            let topology = client.get_topology().await?;
            let out = output::render_single(global.format(), &topology, topology_detail, |t| {
                t.nodes
                    .iter()
                    .map(|n| n.id.clone())
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            output::print_output(&out, global.quiet);
        }
        DocumentCommand::Save { from_file } => {
            let topology: Topology = util::read_json_file(&from_file)?;
            if !util::confirm("Replace the stored topology?", global.yes)? {
                return Ok(());
            }
            client.save_topology(&topology).await?;
            output::notice("Topology saved", global.quiet);
        }
    }
    Ok(())
}

pub async fn system_config(
    console: &Console,
    command: DocumentCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = console.client();
    match command {
        DocumentCommand::Get => {
            let config = client.get_system_config().await?;
            let out = output::render_single(global.format(), &config, system_detail, |c| {
                c.keys().cloned().collect::<Vec<_>>().join("\n")
            })?;
            output::print_output(&out, global.quiet);
        }
        DocumentCommand::Save { from_file } => {
            let config: SystemConfig = util::read_json_file(&from_file)?;
            if !util::confirm("Replace the system configuration?", global.yes)? {
                return Ok(());
            }
            client.save_system_config(&config).await?;
            output::notice("System configuration saved", global.quiet);
        }
    }
    Ok(())
}
