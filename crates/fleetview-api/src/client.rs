// Feed HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction and per-feed
// decoding: the node list is JSON, the status table and detail pages are
// HTML scraped by `crate::html`.

use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::html;
use crate::models::{RawDetail, RawNode, RawStatusRow, StaticNodesEnvelope};
use crate::transport::TransportConfig;

/// HTTP client for the three fleet feeds.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FeedClient {
    /// Create a client rooted at `base_url` (e.g. `https://feeds.example.net`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: Url, http: reqwest::Client) -> Self {
        Self { http, base_url }
    }

    /// The feed base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET `url` and return the body text, mapping non-2xx to `Error::Status`.
    async fn get_text(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(Error::Transport)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the node list from `/staticnodes`.
    ///
    /// Entries that are not objects of the expected shape are skipped;
    /// a body without a `staticnodes` array is an error.
    pub async fn static_nodes(&self) -> Result<Vec<RawNode>, Error> {
        let body = self.get_text(self.endpoint("staticnodes")?).await?;

        let envelope: StaticNodesEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        let rows = envelope
            .staticnodes
            .ok_or_else(|| Error::UnexpectedShape("missing `staticnodes` array".into()))?;

        let total = rows.len();
        let nodes: Vec<RawNode> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(node) => Some(node),
                Err(e) => {
                    debug!(error = %e, "skipping malformed node entry");
                    None
                }
            })
            .collect();

        if nodes.len() < total {
            warn!(total, kept = nodes.len(), "node list contained malformed entries");
        }
        Ok(nodes)
    }

    /// Fetch and scrape the live status table from `/server-status`.
    pub async fn status_table(&self) -> Result<Vec<RawStatusRow>, Error> {
        let body = self.get_text(self.endpoint("server-status")?).await?;
        html::parse_status_table(&body)
    }

    /// Fetch and scrape one node's detail page from `/server-status/{sid}`.
    pub async fn server_detail(&self, sid: &str) -> Result<RawDetail, Error> {
        let body = self
            .get_text(self.endpoint(&format!("server-status/{sid}"))?)
            .await?;
        html::parse_detail_page(&body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = FeedClient::from_reqwest(
            Url::parse("https://feeds.example.net/").unwrap(),
            reqwest::Client::new(),
        );
        assert_eq!(
            client.endpoint("server-status/7").unwrap().as_str(),
            "https://feeds.example.net/server-status/7"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = FeedClient::from_reqwest(
            Url::parse("https://example.net/fleet").unwrap(),
            reqwest::Client::new(),
        );
        assert_eq!(
            client.endpoint("staticnodes").unwrap().as_str(),
            "https://example.net/fleet/staticnodes"
        );
    }
}
