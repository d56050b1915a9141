// Dashboard endpoint

use tracing::trace;

use crate::client::ApiClient;
use crate::encode::Params;
use crate::error::Error;
use crate::models::DashboardSnapshot;
use crate::options::RequestOptions;

impl ApiClient {
    /// Current alarm set and device counters.
    ///
    /// `GET /dashboard/snapshot`
    ///
    /// Polled in the background, so failures are not toasted.
    pub async fn dashboard_snapshot(&self) -> Result<DashboardSnapshot, Error> {
        trace!("polling dashboard snapshot");
        Ok(self
            .fetch_opt(
                "/dashboard/snapshot",
                &Params::new(),
                &RequestOptions::get().quiet(),
            )
            .await?
            .unwrap_or_default())
    }
}
