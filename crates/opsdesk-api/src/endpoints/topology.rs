// Topology endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::encode::{Params, params_from};
use crate::error::Error;
use crate::models::Topology;
use crate::options::RequestOptions;

impl ApiClient {
    /// `GET /topology/get`
    pub async fn get_topology(&self) -> Result<Topology, Error> {
        debug!("fetching topology");
        Ok(self
            .fetch_opt("/topology/get", &Params::new(), &RequestOptions::get())
            .await?
            .unwrap_or_default())
    }

    /// Replace the stored topology.
    ///
    /// `POST /topology/save`
    pub async fn save_topology(&self, topology: &Topology) -> Result<(), Error> {
        debug!(
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            "saving topology"
        );
        self.call(
            "/topology/save",
            &params_from(topology)?,
            &RequestOptions::post().with_loading(),
        )
        .await
    }
}
