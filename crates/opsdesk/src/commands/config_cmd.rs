//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};

use opsdesk_config::{DEVELOPMENT, GatewayEntry};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with plaintext tokens masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for gateways in cfg.environments.values_mut() {
        for entry in gateways.values_mut() {
            if entry.auth_token.is_some() {
                entry.auth_token = Some("****".into());
            }
        }
    }
    cfg
}

/// Format config for display as TOML-ish text.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let d = &cfg.defaults;
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "environment = \"{}\"", d.environment);
    let _ = writeln!(out, "gateway = \"{}\"", d.gateway);
    let _ = writeln!(out, "dev_base = \"{}\"", d.dev_base);
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "session_invalid_codes = {:?}", d.session_invalid_codes);
    let _ = writeln!(out, "logout_delay_ms = {}", d.logout_delay_ms);
    let _ = writeln!(out, "insecure = {}", d.insecure);
    if let Some(ref ca) = d.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }

    let m = &cfg.monitor;
    let _ = writeln!(out);
    let _ = writeln!(out, "[monitor]");
    let _ = writeln!(out, "poll_interval_ms = {}", m.poll_interval_ms);
    let _ = writeln!(out, "pulse_interval_ms = {}", m.pulse_interval_ms);
    let _ = writeln!(out, "flip_interval_ms = {}", m.flip_interval_ms);
    let _ = writeln!(out, "alert = {}", m.alert);

    let mut envs: Vec<_> = cfg.environments.iter().collect();
    envs.sort_by_key(|(name, _)| *name);
    for (env, gateways) in envs {
        let mut gateways: Vec<_> = gateways.iter().collect();
        gateways.sort_by_key(|(name, _)| *name);
        for (gw, entry) in gateways {
            let _ = writeln!(out);
            let _ = writeln!(out, "[environments.{env}.{gw}]");
            let _ = writeln!(out, "target = \"{}\"", entry.target);
            if let Some(ref token) = entry.auth_token {
                let _ = writeln!(out, "auth_token = \"{token}\"");
            }
            if let Some(ref var) = entry.auth_token_env {
                let _ = writeln!(out, "auth_token_env = \"{var}\"");
            }
        }
    }

    out
}

/// Offer to store a token in the system keyring or return it for
/// plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in
/// the keyring.
fn prompt_token_storage(
    token: &str,
    environment: &str,
    gateway: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the gateway token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        opsdesk_config::store_gateway_token(environment, gateway, token)?;
        eprintln!("   ✓ token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            eprintln!("opsdesk configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let environment: String = Input::new()
                .with_prompt("Environment name")
                .default("production".into())
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = opsdesk_config::load_config_from(&path).unwrap_or_default();
            cfg.defaults.environment.clone_from(&environment);

            if environment == DEVELOPMENT {
                let dev_base: String = Input::new()
                    .with_prompt("Local development server")
                    .default(cfg.defaults.dev_base.clone())
                    .interact_text()
                    .map_err(prompt_err)?;
                cfg.defaults.dev_base = dev_base;
            } else {
                let target: String = Input::new()
                    .with_prompt("Default gateway URL")
                    .default("https://console.example.com/gw".into())
                    .interact_text()
                    .map_err(prompt_err)?;

                let token = rpassword::prompt_password("Gateway token (empty for none): ")
                    .map_err(prompt_err)?;
                let gateway = cfg.defaults.gateway.clone();
                let auth_token = if token.is_empty() {
                    None
                } else {
                    prompt_token_storage(&token, &environment, &gateway)?
                };

                cfg.environments
                    .entry(environment.clone())
                    .or_insert_with(HashMap::new)
                    .insert(
                        gateway,
                        GatewayEntry {
                            target,
                            auth_token,
                            auth_token_env: None,
                        },
                    );
            }

            opsdesk_config::save_config_to(&cfg, &path)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active environment: {environment}");
            eprintln!("\n  Next: opsdesk login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load(global)?);
            let out = output::render_single(global.format(), &cfg, format_config, |c| {
                c.defaults.environment.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("config: {}", path.display());
            println!("state:  {}", config::state_file(global).display());
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = opsdesk_config::load_config_from(&path)?;
            if name != DEVELOPMENT && !cfg.environments.contains_key(&name) {
                return Err(CliError::UnknownEnvironment {
                    name,
                    path: path.display().to_string(),
                });
            }
            cfg.defaults.environment.clone_from(&name);
            opsdesk_config::save_config_to(&cfg, &path)?;
            output::notice(&format!("✓ Default environment set to '{name}'"), global.quiet);
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken {
            environment,
            gateway,
        } => {
            let cfg = opsdesk_config::load_config_from(&path)?;
            let environment =
                environment.unwrap_or_else(|| config::active_environment(global, &cfg));
            let known = cfg
                .environments
                .get(&environment)
                .is_some_and(|gws| gws.contains_key(&gateway));
            if !known {
                return Err(CliError::Validation {
                    field: "gateway".into(),
                    reason: format!("no gateway '{gateway}' in environment '{environment}'"),
                });
            }

            let token = rpassword::prompt_password("Gateway token: ").map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            opsdesk_config::store_gateway_token(&environment, &gateway, &token)?;
            output::notice(
                &format!("✓ Token stored in system keyring for {environment}/{gateway}"),
                global.quiet,
            );
            Ok(())
        }
    }
}
