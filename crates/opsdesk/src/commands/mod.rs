//! Command dispatch: bridges CLI args -> console calls -> output formatting.

pub mod admins;
pub mod alarms;
pub mod auth;
pub mod config_cmd;
pub mod dashboard;
pub mod devices;
pub mod documents;
pub mod util;

use opsdesk_core::Console;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a console-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    console: &Console,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        // Session commands manage the session themselves
        Command::Login(args) => auth::login(console, args, global).await,
        Command::Logout => auth::logout(console, global),
        Command::Whoami => auth::whoami(console, global),
        Command::Refresh => auth::refresh(console, global).await,
        Command::Passwd => auth::passwd(console, global).await,

        cmd => {
            console.ensure_session().await?;
            match cmd {
                Command::Devices(args) => devices::handle(console, args, global).await,
                Command::Admins(args) => admins::handle(console, args, global).await,
                Command::Dashboard => dashboard::handle(console, global).await,
                Command::Alarms(args) => alarms::handle(console, args, cfg, global).await,
                Command::Topology(args) => documents::topology(console, args.command, global).await,
                Command::SystemConfig(args) => {
                    documents::system_config(console, args.command, global).await
                }
                // Handled above or before dispatch
                Command::Login(_)
                | Command::Logout
                | Command::Whoami
                | Command::Refresh
                | Command::Passwd
                | Command::Config(_)
                | Command::Completions(_) => unreachable!(),
            }
        }
    }
}

/// Short label for the command, used as the return location after a
/// forced logout.
pub fn label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Refresh => "refresh",
        Command::Passwd => "passwd",
        Command::Devices(_) => "devices",
        Command::Admins(_) => "admins",
        Command::Dashboard => "dashboard",
        Command::Alarms(_) => "alarms",
        Command::Topology(_) => "topology",
        Command::SystemConfig(_) => "system-config",
        Command::Config(_) => "config",
        Command::Completions(_) => "completions",
    }
}
