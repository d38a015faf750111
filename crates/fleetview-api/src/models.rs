// Raw payload types returned by the feed endpoints.
//
// These mirror what the upstream feeds actually contain, with every field
// optional or stringly-typed. Validation and derivation happen in
// `fleetview-core`'s normalizer, never here.

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope of the `/staticnodes` JSON feed.
///
/// Rows are kept as untyped JSON so one malformed entry cannot fail the
/// whole array; the client converts them one by one.
#[derive(Debug, Deserialize)]
pub(crate) struct StaticNodesEnvelope {
    pub staticnodes: Option<Vec<serde_json::Value>>,
}

/// One entry of the node list, as delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Node identifier; numeric in practice, accepted as number or string.
    #[serde(default, deserialize_with = "lenient_id")]
    pub sid: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Free-form location, usually `"<region> (<provider>)"`.
    #[serde(default)]
    pub location: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One row of the HTML status table, reduced to the cell texts we use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatusRow {
    pub sid: String,
    /// Slash-delimited `cpu / io / nic` triple, whitespace removed.
    pub system_load: String,
    pub traffic: String,
    pub congestion: String,
}

/// A chart image found on a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawChart {
    /// Absolute image URL.
    pub src: String,
    /// Text of the list item that contains the image.
    pub title: String,
}

/// Fields scraped from a node's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDetail {
    pub private_ip: String,
    pub uptime: String,
    pub heartbeat: String,
    pub price_policy: Vec<String>,
    pub charts: Vec<RawChart>,
}
