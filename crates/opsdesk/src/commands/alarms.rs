//! Alarm command handlers: list, clear, and the live watch.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use opsdesk_api::models::AlarmDevice;
use opsdesk_core::{AlarmView, AlertSink, Console, CoreError};

use crate::cli::{AlarmsArgs, AlarmsCommand, GlobalOpts, WatchArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;
use crate::terminal::TerminalAlertSink;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct AlarmEntry<'a> {
    new: bool,
    #[serde(flatten)]
    alarm: &'a AlarmDevice,
}

#[derive(Tabled)]
struct AlarmRow {
    #[tabled(rename = "")]
    status: String,
    #[tabled(rename = "Device ID")]
    device_id: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Alarm")]
    alarm: String,
    #[tabled(rename = "Suggested action")]
    action: String,
    #[tabled(rename = "Raised")]
    raised: String,
}

impl From<&AlarmEntry<'_>> for AlarmRow {
    fn from(e: &AlarmEntry<'_>) -> Self {
        Self {
            status: if e.new { "NEW" } else { "" }.into(),
            device_id: e.alarm.device_id.clone(),
            device: e.alarm.device_name.clone(),
            group: e.alarm.device_type_group.clone(),
            alarm: e.alarm.alarm_item.config_type_name.clone(),
            action: e.alarm.alarm_item.suggested_action.clone(),
            raised: util::format_time(e.alarm.alarm_at),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: AlarmsArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlarmsCommand::List { new } => {
            let (_, summary) = console.alarm_summary().await?;
            let mut entries: Vec<AlarmEntry<'_>> = summary
                .new
                .iter()
                .map(|alarm| AlarmEntry { new: true, alarm })
                .collect();
            if !new {
                entries.extend(
                    summary
                        .historical
                        .iter()
                        .map(|alarm| AlarmEntry { new: false, alarm }),
                );
            }
            let out = output::render_list(
                global.format(),
                &entries,
                |e| AlarmRow::from(e),
                |e| e.alarm.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::Clear => {
            let baseline = console.clear_alarms(Utc::now())?;
            output::notice(
                &format!("Alarms up to {} marked as seen", util::format_time(Some(baseline))),
                global.quiet,
            );
            Ok(())
        }

        AlarmsCommand::Watch(watch_args) => watch(console, &watch_args, cfg, global).await,
    }
}

// ── Watch ───────────────────────────────────────────────────────────

fn status_line(view: &AlarmView) -> String {
    let monitor = &view.monitor;
    if monitor.is_loading() {
        return view
            .last_error
            .as_ref()
            .map_or_else(|| "loading...".into(), |e| format!("loading... ({e})"));
    }
    let summary = monitor.summary();
    let mut line = format!(
        "{} new / {} alarms | alert {} ({})",
        summary.new.len(),
        summary.new.len() + summary.historical.len(),
        if monitor.alert_enabled() { "on" } else { "off" },
        monitor.state(),
    );
    if let Some(ref err) = view.last_error {
        line.push_str(&format!(" | poll failed x{}: {err}", monitor.consecutive_failures()));
    }
    line
}

async fn watch(
    console: &Console,
    args: &WatchArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    console.ensure_session().await?;

    let sink = Arc::new(TerminalAlertSink::new(output::should_color(
        global.color_mode(),
    )));
    let monitor_config = config::monitor_config(cfg, args);
    let watch = console.watch_alarms(
        Arc::clone(&sink) as Arc<dyn AlertSink>,
        &monitor_config,
        args.alert || cfg.monitor.alert,
    );
    output::notice(
        "Watching alarms. Enter a to toggle the alert, c to clear, q to quit.",
        global.quiet,
    );

    let mut views = watch.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        let view = views.borrow_and_update().clone();
        if view.session_lost {
            break Err(CliError::from(CoreError::SessionExpired {
                message: "the console ended the session during the watch".into(),
            }));
        }
        sink.set_status(status_line(&view));

        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            changed = views.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(input)) => match input.trim() {
                    "a" => {
                        let enabled = watch.toggle_alert();
                        info!(enabled, "alert toggled");
                    }
                    "c" => {
                        if let Err(e) = watch.clear(Utc::now()) {
                            break Err(CliError::from(e));
                        }
                    }
                    "q" => break Ok(()),
                    other => warn!(input = other, "unknown key"),
                },
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    };

    watch.stop().await;
    result
}
