// Device inventory endpoints

use bytes::Bytes;
use tracing::debug;

use crate::client::ApiClient;
use crate::encode::{Params, params_from};
use crate::error::Error;
use crate::models::{Device, DeviceQuery, DeviceType, Page};
use crate::options::RequestOptions;

impl ApiClient {
    /// `GET /device/list`
    pub async fn list_devices(&self, query: &DeviceQuery) -> Result<Page<Device>, Error> {
        debug!(?query, "listing devices");
        self.fetch("/device/list", &params_from(query)?, &RequestOptions::get())
            .await
    }

    /// Create or update a device. Unknown fields on `device` are sent back
    /// unchanged.
    ///
    /// `POST /device/save`
    pub async fn save_device(&self, device: &Device) -> Result<(), Error> {
        debug!(device_id = %device.device_id, "saving device");
        self.call(
            "/device/save",
            &params_from(device)?,
            &RequestOptions::post().with_loading(),
        )
        .await
    }

    /// Flip a device in or out of maintenance.
    ///
    /// `POST /device/toggle-maintaining` (form-encoded)
    pub async fn toggle_device_maintaining(
        &self,
        device_id: &str,
        maintaining: bool,
    ) -> Result<(), Error> {
        debug!(device_id, maintaining, "toggling maintenance");
        let mut params = Params::new();
        params.insert("device_id".into(), device_id.into());
        params.insert("maintaining".into(), maintaining.into());
        self.call(
            "/device/toggle-maintaining",
            &params,
            &RequestOptions::post().form(),
        )
        .await
    }

    /// `GET /device/types`
    pub async fn list_device_types(&self) -> Result<Vec<DeviceType>, Error> {
        debug!("listing device types");
        Ok(self
            .fetch_opt("/device/types", &Params::new(), &RequestOptions::get())
            .await?
            .unwrap_or_default())
    }

    /// Export the filtered inventory as a spreadsheet.
    ///
    /// `GET /device/export` (blob)
    pub async fn export_devices(&self, query: &DeviceQuery) -> Result<Bytes, Error> {
        debug!(?query, "exporting devices");
        self.download(
            "/device/export",
            &params_from(query)?,
            &RequestOptions::get().with_loading(),
        )
        .await
    }
}
