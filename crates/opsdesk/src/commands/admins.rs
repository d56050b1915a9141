//! Admin account command handlers.

use secrecy::ExposeSecret;
use tabled::Tabled;

use opsdesk_api::models::{Admin, NewAdmin};
use opsdesk_core::Console;

use crate::cli::{AdminsArgs, AdminsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct AdminRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Admin> for AdminRow {
    fn from(a: &Admin) -> Self {
        Self {
            id: a.id.clone(),
            account: a.account.clone(),
            name: a.name.clone(),
            role: a.role.clone(),
            status: if a.disabled { "disabled" } else { "active" }.into(),
            created: util::format_time(a.created_at),
        }
    }
}

pub async fn handle(
    console: &Console,
    args: AdminsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = console.client();
    match args.command {
        AdminsCommand::List(list) => {
            let page = client.list_admins(list.page, list.page_size).await?;
            let out = output::render_list(
                global.format(),
                &page.list,
                |a| AdminRow::from(a),
                |a| a.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AdminsCommand::Create {
            account,
            name,
            role,
        } => {
            let password = util::prompt_new_secret("Password for the new admin: ")?;
            let admin = NewAdmin {
                name: name.unwrap_or_else(|| account.clone()),
                account,
                role,
                password: password.expose_secret().to_owned(),
            };
            client.create_admin(&admin).await?;
            output::notice(&format!("Admin '{}' created", admin.account), global.quiet);
            Ok(())
        }

        AdminsCommand::ResetPassword { id } => {
            if !util::confirm(&format!("Reset the password of admin {id}?"), global.yes)? {
                return Ok(());
            }
            client.reset_admin_password(&id).await?;
            output::notice("Password reset", global.quiet);
            Ok(())
        }

        AdminsCommand::Disable { id } => {
            if !util::confirm(&format!("Disable admin {id}?"), global.yes)? {
                return Ok(());
            }
            client.disable_admin(&id).await?;
            output::notice(&format!("Admin {id} disabled"), global.quiet);
            Ok(())
        }
    }
}
