// Auth endpoints
//
// Login and refresh persist the returned session; logout is local only.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::encode::{Params, params_from};
use crate::error::Error;
use crate::models::LoginResponse;
use crate::options::RequestOptions;
use crate::session::Session;

/// Username/password pair for `/auth/login`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub account: String,
    pub password: SecretString,
}

impl ApiClient {
    /// Authenticate and persist the new session.
    ///
    /// `POST /auth/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        debug!(account = %credentials.account, "logging in");
        let params = params_from(&json!({
            "account": credentials.account,
            "password": credentials.password.expose_secret(),
        }))?;
        let resp: LoginResponse = self
            .fetch("/auth/login", &params, &RequestOptions::post().with_loading())
            .await?;
        let session = Session::from_login(resp, Utc::now(), None).ok_or_else(|| {
            Error::Deserialization {
                message: "login response carried no user info".into(),
                body: String::new(),
            }
        })?;
        self.sessions().save(&session)?;
        info!(account = %session.user.account, "logged in");
        Ok(session)
    }

    /// Change the logged-in account's password.
    ///
    /// `POST /auth/change-password`
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), Error> {
        debug!("changing password");
        let params = params_from(&json!({
            "old_password": old_password.expose_secret(),
            "new_password": new_password.expose_secret(),
        }))?;
        self.call(
            "/auth/change-password",
            &params,
            &RequestOptions::post().with_loading(),
        )
        .await
    }

    /// Exchange the current token for a fresh one.
    ///
    /// `POST /auth/refresh-token`
    pub async fn refresh_token(&self) -> Result<Session, Error> {
        let current = self.sessions().load().ok_or(Error::NotAuthenticated)?;
        debug!(account = %current.user.account, "refreshing token");
        let resp: LoginResponse = self
            .fetch("/auth/refresh-token", &Params::new(), &RequestOptions::post())
            .await?;
        let session = Session::from_login(resp, Utc::now(), Some(current.user))
            .ok_or(Error::NotAuthenticated)?;
        self.sessions().save(&session)?;
        Ok(session)
    }

    /// Drop the stored session and cancel its in-flight requests.
    ///
    /// The server keeps no session state, so nothing is sent.
    pub fn logout(&self) -> Result<(), Error> {
        self.scopes().cancel_current();
        self.sessions().clear()?;
        info!("logged out");
        Ok(())
    }
}
