use mppr_core::{AutoScalerConfig, RecoveryKind, Topology, TopologyError};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::topology::TopologyFetcher;

const FETCH_PATH: &str = "fetch_topology";
const RECOVER_PATH: &str = "recover_and_fetch_topology";

/// Blocking client for an auto-scaler service that owns the compute node pool.
#[derive(Debug, Clone)]
pub struct AutoScalerTopologyFetcher {
    client: Client,
    base: Url,
    cluster_id: String,
}

#[derive(Debug, Serialize)]
struct RecoverBody<'a> {
    cluster_id: &'a str,
    recovery_type: RecoveryKind,
    node_count: usize,
}

#[derive(Debug, Deserialize)]
struct TopologyResponse {
    topology: Vec<String>,
}

impl AutoScalerTopologyFetcher {
    pub fn new(cfg: &AutoScalerConfig) -> Result<Self, TopologyError> {
        let base = cfg
            .address_url()
            .map_err(|e| TopologyError::Request(format!("invalid auto-scaler address: {e}")))?;
        let client = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(concat!("mppr-exec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TopologyError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base,
            cluster_id: cfg.cluster_id.clone(),
        })
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn endpoint(&self, path: &str) -> Result<Url, TopologyError> {
        self.base
            .join(path)
            .map_err(|e| TopologyError::Request(format!("invalid auto-scaler endpoint {path}: {e}")))
    }
}

impl TopologyFetcher for AutoScalerTopologyFetcher {
    fn fetch_topology(&self) -> Result<Topology, TopologyError> {
        let mut url = self.endpoint(FETCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("tidbclusterid", &self.cluster_id);
        debug!(%url, "fetching topology from auto-scaler");

        let resp = self.client.get(url).send().map_err(map_reqwest_error)?;
        read_topology(resp)
    }

    fn recover_and_fetch(
        &self,
        kind: RecoveryKind,
        node_count: usize,
    ) -> Result<Topology, TopologyError> {
        let url = self.endpoint(RECOVER_PATH)?;
        info!(
            cluster_id = %self.cluster_id,
            recovery = %kind,
            node_count,
            "requesting topology recovery from auto-scaler"
        );

        let body = RecoverBody {
            cluster_id: &self.cluster_id,
            recovery_type: kind,
            node_count,
        };
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(map_reqwest_error)?;
        read_topology(resp)
    }
}

fn read_topology(resp: Response) -> Result<Topology, TopologyError> {
    let status = resp.status();
    let body = resp.text().map_err(map_reqwest_error)?;
    if !status.is_success() {
        return Err(TopologyError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TopologyResponse =
        serde_json::from_str(&body).map_err(|e| TopologyError::InvalidResponse(e.to_string()))?;
    if parsed.topology.is_empty() {
        return Err(TopologyError::InvalidResponse("empty topology".to_string()));
    }
    Ok(Topology::new(parsed.topology))
}

fn map_reqwest_error(e: reqwest::Error) -> TopologyError {
    if e.is_timeout() {
        return TopologyError::Request(format!("timeout: {e}"));
    }
    TopologyError::Request(e.to_string())
}
