//! Clap derive structures for the `opsdesk` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// opsdesk -- terminal front end for the operations management console
#[derive(Debug, Parser)]
#[command(
    name = "opsdesk",
    version,
    about = "Operate the management console from the command line",
    long_about = "Log in to the management console, manage devices and admin accounts,\n\
        and watch the alarm dashboard with an audible alert.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Deploy environment (`development` routes to the local server)
    #[arg(long, short = 'e', env = "OPSDESK_ENV", global = true)]
    pub environment: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "OPSDESK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "OPSDESK_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OPSDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "OPSDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Session and alarm state file
    #[arg(long, env = "OPSDESK_STATE_FILE", global = true, hide_env = true)]
    pub state_file: Option<PathBuf>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "OPSDESK_CONFIG", global = true, hide_env = true)]
    pub config: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login(LoginArgs),

    /// Drop the stored session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Exchange the session token for a fresh one
    Refresh,

    /// Change the logged-in account's password
    Passwd,

    /// Manage devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage admin accounts
    Admins(AdminsArgs),

    /// Show dashboard totals
    #[command(alias = "dash")]
    Dashboard,

    /// List, clear, and watch alarms
    Alarms(AlarmsArgs),

    /// Read or replace the device topology
    Topology(TopologyArgs),

    /// Read or replace the system configuration
    #[command(alias = "sys")]
    SystemConfig(SystemConfigArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Shared pagination arguments for list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Results per page
    #[arg(long, short = 'l', default_value = "25")]
    pub page_size: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account name (prompted when omitted)
    #[arg(long, short = 'u', env = "OPSDESK_ACCOUNT")]
    pub account: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Args)]
pub struct DeviceFilter {
    /// Match device name or id
    #[arg(long)]
    pub keyword: Option<String>,

    /// Only devices of this type group
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        #[command(flatten)]
        filter: DeviceFilter,
    },

    /// Create or update a device from a JSON file
    Save {
        /// JSON file with the device record
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Put a device into or out of maintenance
    Maintain {
        /// Device id
        device: String,

        /// Take the device out of maintenance
        #[arg(long)]
        off: bool,
    },

    /// List device types
    Types,

    /// Export the device list as a spreadsheet
    Export {
        #[command(flatten)]
        filter: DeviceFilter,

        /// Destination file
        #[arg(long, short = 'O', default_value = "devices.xlsx")]
        out: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ADMINS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AdminsArgs {
    #[command(subcommand)]
    pub command: AdminsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AdminsCommand {
    /// List admin accounts
    #[command(alias = "ls")]
    List(ListArgs),

    /// Create an admin account (password is prompted)
    Create {
        /// Login name
        account: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Role key
        #[arg(long, default_value = "operator")]
        role: String,
    },

    /// Reset an admin's password to the server default
    ResetPassword {
        /// Admin id
        id: String,
    },

    /// Disable an admin account
    Disable {
        /// Admin id
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALARMS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlarmsArgs {
    #[command(subcommand)]
    pub command: AlarmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlarmsCommand {
    /// List current alarms, split into new and historical
    #[command(alias = "ls")]
    List {
        /// Only alarms raised since the last clear
        #[arg(long)]
        new: bool,
    },

    /// Mark every current alarm as seen
    Clear,

    /// Poll the dashboard and alert on new alarms
    ///
    /// Keys while watching: `a` + Enter toggles the audible alert,
    /// `c` + Enter clears, `q` + Enter quits.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Start with the audible alert on
    #[arg(long)]
    pub alert: bool,

    /// Dashboard poll interval (e.g. `3s`)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Audible pulse interval
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pulse_interval: Option<Duration>,

    /// Indicator flash interval
    #[arg(long, value_parser = humantime::parse_duration)]
    pub flip_interval: Option<Duration>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOPOLOGY / SYSTEM CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TopologyArgs {
    #[command(subcommand)]
    pub command: DocumentCommand,
}

#[derive(Debug, Args)]
pub struct SystemConfigArgs {
    #[command(subcommand)]
    pub command: DocumentCommand,
}

/// Read/replace pair for whole-document resources.
#[derive(Debug, Subcommand)]
pub enum DocumentCommand {
    /// Fetch the current document
    Get,

    /// Replace the document from a JSON file
    Save {
        /// JSON file with the full document
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config and state file locations
    Path,

    /// Set the default environment
    Use {
        /// Environment name
        name: String,
    },

    /// Store a gateway token in the system keyring
    SetToken {
        /// Environment name (defaults to the active one)
        #[arg(long)]
        environment: Option<String>,

        /// Gateway key
        #[arg(long, default_value = "default")]
        gateway: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

impl GlobalOpts {
    /// Output format after config defaults have been applied.
    pub fn format(&self) -> &OutputFormat {
        self.output.as_ref().unwrap_or(&OutputFormat::Table)
    }

    pub fn color_mode(&self) -> &ColorMode {
        self.color.as_ref().unwrap_or(&ColorMode::Auto)
    }

    /// Fill unset output/color flags from `[defaults]`.
    pub fn apply_defaults(&mut self, output: &str, color: &str) {
        if self.output.is_none() {
            self.output = OutputFormat::from_str(output, true).ok();
        }
        if self.color.is_none() {
            self.color = ColorMode::from_str(color, true).ok();
        }
    }
}
