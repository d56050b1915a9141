// Admin account endpoints

use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::encode::{Params, params_from};
use crate::error::Error;
use crate::models::{Admin, NewAdmin, Page};
use crate::options::RequestOptions;

impl ApiClient {
    /// `GET /admin/list`
    pub async fn list_admins(&self, page: u32, page_size: u32) -> Result<Page<Admin>, Error> {
        debug!(page, page_size, "listing admins");
        let params = params_from(&json!({ "page": page, "page_size": page_size }))?;
        self.fetch("/admin/list", &params, &RequestOptions::get())
            .await
    }

    /// `POST /admin/create`
    pub async fn create_admin(&self, admin: &NewAdmin) -> Result<(), Error> {
        debug!(account = %admin.account, "creating admin");
        self.call(
            "/admin/create",
            &params_from(admin)?,
            &RequestOptions::post().with_loading(),
        )
        .await
    }

    /// Reset an admin's password to the server default.
    ///
    /// `POST /admin/reset-password` (form-encoded)
    pub async fn reset_admin_password(&self, id: &str) -> Result<(), Error> {
        debug!(id, "resetting admin password");
        self.call(
            "/admin/reset-password",
            &id_param(id),
            &RequestOptions::post().form(),
        )
        .await
    }

    /// `POST /admin/disable` (form-encoded)
    pub async fn disable_admin(&self, id: &str) -> Result<(), Error> {
        debug!(id, "disabling admin");
        self.call("/admin/disable", &id_param(id), &RequestOptions::post().form())
            .await
    }
}

fn id_param(id: &str) -> Params {
    let mut params = Params::new();
    params.insert("id".into(), id.into());
    params
}
