// ── Feed sources ──
//
// The engine reads the three feeds through these traits so it can run
// against the HTTP client or an in-memory fake. `FeedClient` implements
// all of them.

use std::future::Future;

use fleetview_api::{FeedClient, RawDetail, RawNode, RawStatusRow};

use crate::error::{DetailFetchError, Feed, IngestionError};
use crate::model::NodeId;

/// Supplier of the raw node list.
pub trait NodeSource: Send + Sync + 'static {
    fn fetch_nodes(&self) -> impl Future<Output = Result<Vec<RawNode>, IngestionError>> + Send;
}

/// Supplier of the raw status table.
pub trait MetricsSource: Send + Sync + 'static {
    fn fetch_metrics(&self) -> impl Future<Output = Result<Vec<RawStatusRow>, IngestionError>> + Send;
}

/// Supplier of one node's raw detail page.
pub trait DetailSource: Send + Sync + 'static {
    fn fetch_detail(&self, id: &NodeId) -> impl Future<Output = Result<RawDetail, DetailFetchError>> + Send;
}

/// Everything the controller needs.
pub trait FleetSource: NodeSource + MetricsSource + DetailSource {}

impl<T: NodeSource + MetricsSource + DetailSource> FleetSource for T {}

impl NodeSource for FeedClient {
    async fn fetch_nodes(&self) -> Result<Vec<RawNode>, IngestionError> {
        self.static_nodes()
            .await
            .map_err(|e| IngestionError::from_api(Feed::Nodes, &e))
    }
}

impl MetricsSource for FeedClient {
    async fn fetch_metrics(&self) -> Result<Vec<RawStatusRow>, IngestionError> {
        self.status_table()
            .await
            .map_err(|e| IngestionError::from_api(Feed::Metrics, &e))
    }
}

impl DetailSource for FeedClient {
    async fn fetch_detail(&self, id: &NodeId) -> Result<RawDetail, DetailFetchError> {
        self.server_detail(id.as_str())
            .await
            .map_err(|e| DetailFetchError::from_api(id, &e))
    }
}
