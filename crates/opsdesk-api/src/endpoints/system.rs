// System configuration endpoints
//
// Every successful read or write refreshes the copy cached under
// `system_config` so front ends can start without a round trip.

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::encode::Params;
use crate::error::Error;
use crate::models::SystemConfig;
use crate::options::RequestOptions;
use crate::storage::keys;

impl ApiClient {
    /// `GET /system-config/get`
    pub async fn get_system_config(&self) -> Result<SystemConfig, Error> {
        debug!("fetching system config");
        let config: SystemConfig = self
            .fetch_opt("/system-config/get", &Params::new(), &RequestOptions::get())
            .await?
            .unwrap_or_default();
        self.cache_system_config(&config);
        Ok(config)
    }

    /// `POST /system-config/save`
    pub async fn save_system_config(&self, config: &SystemConfig) -> Result<(), Error> {
        debug!(keys = config.len(), "saving system config");
        self.call(
            "/system-config/save",
            config,
            &RequestOptions::post().with_loading(),
        )
        .await?;
        self.cache_system_config(config);
        Ok(())
    }

    /// The last system config seen by this client, if any.
    pub fn cached_system_config(&self) -> Option<SystemConfig> {
        let raw = self.store().get(keys::SYSTEM_CONFIG)?;
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cached system config");
                None
            }
        }
    }

    fn cache_system_config(&self, config: &SystemConfig) {
        let raw = Value::Object(config.clone()).to_string();
        if let Err(e) = self.store().set(keys::SYSTEM_CONFIG, raw) {
            warn!(error = %e, "failed to cache system config");
        }
    }
}
