use crate::client::HttpsClient;
use crate::latency::LatencyTable;
use crate::metrics::Metrics;
use crate::upstream::UpstreamList;
use std::sync::Arc;

/// Shared proxy state, cheaply cloneable — one instance handed to every
/// accepted connection, in the style of the teacher's `GatewayState`.
/// Unlike the teacher, nothing here is hot-reloaded: the upstream list is
/// resolved once at startup from the Upstream Registry (spec §4.1) and the
/// Latency Table is the only thing that mutates while the process runs.
#[derive(Clone)]
pub struct AppState {
    pub upstreams: Arc<UpstreamList>,
    pub latency_table: Arc<LatencyTable>,
    pub client: HttpsClient,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(upstreams: UpstreamList, client: HttpsClient, metrics: Metrics) -> Self {
        Self {
            upstreams: Arc::new(upstreams),
            latency_table: Arc::new(LatencyTable::new()),
            client,
            metrics,
        }
    }
}
