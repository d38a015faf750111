use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// What a chart image on a detail page plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ChartKind {
    SystemLoad,
    Network,
    Congestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartImage {
    pub kind: ChartKind,
    pub src: String,
    pub title: String,
    /// Display order; lower first.
    pub score: u64,
}

/// Lazily fetched per-node supplement. Immutable once cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub uptime: String,
    pub heartbeat: String,
    pub private_ip: String,
    pub price_policy: Vec<String>,
    /// At most one chart per kind, ordered by score.
    pub charts: Vec<ChartImage>,
    pub fetched_at: DateTime<Utc>,
}
