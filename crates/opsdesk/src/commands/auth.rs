//! Session command handlers: login, logout, whoami, refresh, passwd.

use secrecy::SecretString;
use serde::Serialize;
use tracing::info;

use opsdesk_api::Session;
use opsdesk_core::Console;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// What `whoami` prints; never the token.
#[derive(Serialize)]
struct SessionView {
    account: String,
    name: String,
    role: String,
    expires_at: String,
    refresh_after: String,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            account: s.user.account.clone(),
            name: s.user.name.clone(),
            role: s.user.role.clone(),
            expires_at: s.expires_at.to_rfc3339(),
            refresh_after: s.refresh_after.to_rfc3339(),
        }
    }
}

fn detail(s: &SessionView) -> String {
    [
        format!("Account:  {}", s.account),
        format!("Name:     {}", if s.name.is_empty() { "-" } else { &s.name }),
        format!("Role:     {}", if s.role.is_empty() { "-" } else { &s.role }),
        format!("Expires:  {}", s.expires_at),
        format!("Refresh:  {}", s.refresh_after),
    ]
    .join("\n")
}

fn print_session(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.format(),
        &SessionView::from(session),
        detail,
        |s| s.account.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn password_from(args: &LoginArgs) -> Result<SecretString, CliError> {
    if let Some(ref var) = args.password_env {
        return std::env::var(var)
            .map(SecretString::from)
            .map_err(|_| CliError::Validation {
                field: "password-env".into(),
                reason: format!("environment variable {var} is not set"),
            });
    }
    util::prompt_secret("Password: ")
}

pub async fn login(console: &Console, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let account = match args.account.clone() {
        Some(account) => account,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Account")
            .interact_text()
            .map_err(util::prompt_err)?,
    };
    let password = password_from(&args)?;

    let session = console.login(&account, password).await?;
    info!(account = %session.user.account, "logged in");
    output::notice(&format!("Logged in as {}", session.user.account), global.quiet);
    Ok(())
}

pub fn logout(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    console.logout()?;
    output::notice("Logged out", global.quiet);
    Ok(())
}

pub fn whoami(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let session = console.session().ok_or(CliError::NotAuthenticated)?;
    print_session(&session, global)
}

pub async fn refresh(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let session = console.client().refresh_token().await?;
    print_session(&session, global)
}

pub async fn passwd(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    console.ensure_session().await?;
    let old = util::prompt_secret("Current password: ")?;
    let new = util::prompt_new_secret("New password: ")?;
    console.client().change_password(&old, &new).await?;
    output::notice("Password changed", global.quiet);
    Ok(())
}
