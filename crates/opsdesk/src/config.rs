//! CLI configuration: a thin layer over `opsdesk_config`.
//!
//! Applies `GlobalOpts` flag overrides (--environment, --insecure,
//! --timeout, --state-file) and wires the terminal hooks into a
//! `Console`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use opsdesk_api::{FileStore, TlsMode};
use opsdesk_core::{Console, ConsoleConfig, MonitorConfig};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;
use crate::terminal::TerminalFeedback;

pub use opsdesk_config::Config;

/// Config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(opsdesk_config::config_path)
}

/// State file in effect: `--state-file` or the platform default.
pub fn state_file(global: &GlobalOpts) -> PathBuf {
    global
        .state_file
        .clone()
        .unwrap_or_else(opsdesk_config::state_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(opsdesk_config::load_config_from(&config_file(global))?)
}

/// Environment name from the flag, else `[defaults]`.
pub fn active_environment(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .environment
        .clone()
        .unwrap_or_else(|| cfg.defaults.environment.clone())
}

/// Translate the file config plus flags into a `ConsoleConfig`.
pub fn console_config(global: &GlobalOpts, cfg: &Config) -> Result<ConsoleConfig, CliError> {
    let environment = active_environment(global, cfg);
    let mut console = opsdesk_config::to_console_config(cfg, Some(&environment))?;
    if global.insecure {
        console.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        console.timeout = Duration::from_secs(secs);
    }
    Ok(console)
}

/// Open a console over the state file with terminal feedback hooks.
pub fn open_console(global: &GlobalOpts, cfg: &Config) -> Result<Console, CliError> {
    let console_config = console_config(global, cfg)?;
    let store = Arc::new(FileStore::open(state_file(global)));
    let hooks = Arc::new(TerminalFeedback::new(
        global.quiet,
        output::should_color(global.color_mode()),
    ));
    Ok(Console::with_hooks(
        &console_config,
        store,
        Arc::clone(&hooks) as Arc<dyn opsdesk_api::Feedback>,
        hooks,
    )?)
}

/// `[monitor]` intervals with `alarms watch` flag overrides.
pub fn monitor_config(cfg: &Config, args: &WatchArgs) -> MonitorConfig {
    let mut monitor = cfg.monitor.to_monitor_config();
    if let Some(poll) = args.poll_interval {
        monitor.poll_interval = poll;
    }
    if let Some(pulse) = args.pulse_interval {
        monitor.pulse_interval = pulse;
    }
    if let Some(flip) = args.flip_interval {
        monitor.flip_interval = flip;
    }
    monitor
}
