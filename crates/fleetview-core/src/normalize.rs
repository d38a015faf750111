// ── Feed normalization ──
//
// Pure functions that turn raw feed records into typed nodes, metric
// snapshots and detail records. Malformed rows are skipped one by one;
// a feed whose every row is malformed is rejected as a whole.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use fleetview_api::{RawDetail, RawNode, RawStatusRow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Feed, IngestionError};
use crate::model::{
    ChartImage, ChartKind, DetailRecord, MetricReading, MetricSnapshot, MetricsTable, Node, NodeId,
    PLACEHOLDER,
};
use crate::view::sort::compare_text;

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.+)\)\s*$").expect("location regex"));

static REGION_COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2})\s").expect("region country regex"));

static HOST_COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^node-([a-z]{2})-").expect("host country regex"));

static TRAILING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]*\d+$").expect("trailing number regex"));

static NUMERIC_JUNK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("numeric junk regex"));

static LEADING_FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").expect("float regex"));

static CHART_SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)_").expect("chart score regex"));

static CHART_CONGESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)loadavg").expect("chart regex"));

static CHART_NETWORK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)eth0|traffic|io").expect("chart regex"));

static CHART_SYSTEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)proc|system|cpu").expect("chart regex"));

const UNSCORED_CHART: u64 = u64::MAX - 5;

// ── Brand table ──────────────────────────────────────────────────────

/// One brand recognition rule.
///
/// `keywords` match as case-insensitive substrings of the provider text,
/// `words` only as whole words (so `do` does not match `Toronto`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRule {
    pub brand: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub words: Vec<String>,
}

impl BrandRule {
    pub fn new(brand: &str, keywords: &[&str]) -> Self {
        Self {
            brand: brand.to_owned(),
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            words: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_words(mut self, words: &[&str]) -> Self {
        self.words = words.iter().map(|w| (*w).to_owned()).collect();
        self
    }

    fn matches(&self, lowered: &str) -> bool {
        if self.keywords.iter().any(|k| lowered.contains(&k.to_lowercase())) {
            return true;
        }
        self.words.iter().any(|w| {
            let w = w.to_lowercase();
            lowered
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == w)
        })
    }
}

/// Ordered brand rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandTable {
    pub rules: Vec<BrandRule>,
}

impl Default for BrandTable {
    fn default() -> Self {
        Self {
            rules: vec![
                BrandRule::new("Google", &["google"]),
                BrandRule::new("Amazon", &["amazon", "aws"]),
                BrandRule::new("Azure", &["azure", "microsoft"]),
                BrandRule::new("LightNode", &["lightnode"]),
                BrandRule::new("Linode", &["linode"]),
                BrandRule::new("DigitalOcean", &["digitalocean"]).with_words(&["do"]),
                BrandRule::new("Vultr", &["vultr"]),
            ],
        }
    }
}

impl BrandTable {
    pub fn new(rules: Vec<BrandRule>) -> Self {
        Self { rules }
    }
}

// ── Derivation helpers ───────────────────────────────────────────────

/// Split `"<region> (<provider>)"`; without a parenthetical the provider is empty.
pub fn split_location(raw: &str) -> (String, String) {
    match LOCATION_RE.captures(raw) {
        Some(caps) => (caps[1].trim().to_owned(), caps[2].trim().to_owned()),
        None => (raw.trim().to_owned(), String::new()),
    }
}

/// Brand for a provider string: first matching table rule, else the last
/// `-` segment with any trailing number removed.
pub fn derive_brand(provider: &str, brands: &BrandTable) -> String {
    let raw = provider.trim();
    if raw.is_empty() {
        return String::new();
    }
    let lowered = raw.to_lowercase();
    if let Some(rule) = brands.rules.iter().find(|r| r.matches(&lowered)) {
        return rule.brand.clone();
    }

    let unsuffixed = TRAILING_NUMBER_RE.replace(raw, "");
    let last = unsuffixed.rsplit('-').next().unwrap_or_default().trim();
    if last.is_empty() {
        raw.to_owned()
    } else {
        last.to_owned()
    }
}

/// Country code from a `"XX "` region prefix, else a `node-xx-` hostname, else `"??"`.
pub fn derive_country(region: &str, hostname: &str) -> String {
    if let Some(caps) = REGION_COUNTRY_RE.captures(region) {
        return caps[1].to_owned();
    }
    if let Some(caps) = HOST_COUNTRY_RE.captures(hostname) {
        return caps[1].to_uppercase();
    }
    "??".to_owned()
}

/// Lenient numeric parse: drop everything but digits, `.` and `-`, then
/// read the leading float. `None` for anything unparseable.
pub fn parse_metric_value(text: &str) -> Option<f64> {
    let cleaned = NUMERIC_JUNK_RE.replace_all(text, "");
    let m = LEADING_FLOAT_RE.find(&cleaned)?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn reading(text: &str) -> MetricReading {
    let trimmed = text.trim();
    MetricReading {
        value: parse_metric_value(trimmed),
        display: if trimmed.is_empty() {
            PLACEHOLDER.to_owned()
        } else {
            trimmed.to_owned()
        },
    }
}

fn chart_kind(src: &str) -> Option<ChartKind> {
    if CHART_CONGESTION_RE.is_match(src) {
        Some(ChartKind::Congestion)
    } else if CHART_NETWORK_RE.is_match(src) {
        Some(ChartKind::Network)
    } else if CHART_SYSTEM_RE.is_match(src) {
        Some(ChartKind::SystemLoad)
    } else {
        None
    }
}

fn chart_score(src: &str) -> u64 {
    CHART_SCORE_RE
        .captures(src)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(UNSCORED_CHART)
}

// ── Normalizer ───────────────────────────────────────────────────────

/// Turns raw feed payloads into typed records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    brands: BrandTable,
}

impl Normalizer {
    pub fn new(brands: BrandTable) -> Self {
        Self { brands }
    }

    pub fn node(&self, id: NodeId, hostname: &str, ipv4: &str, raw_location: &str) -> Node {
        Node::new(id, hostname.trim(), ipv4.trim(), raw_location.trim(), &self.brands)
    }

    /// Typed node table, ordered by region then hostname.
    ///
    /// Rows without an id, and repeats of an id already seen, are skipped.
    pub fn normalize_nodes(&self, raw: Vec<RawNode>) -> Result<Vec<Node>, IngestionError> {
        let total = raw.len();
        let mut seen = HashSet::new();
        let mut nodes: Vec<Node> = raw
            .into_iter()
            .filter_map(|row| {
                let sid = row.sid.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
                if !seen.insert(sid.to_owned()) {
                    return None;
                }
                Some(self.node(
                    NodeId::from(sid),
                    row.hostname.as_deref().unwrap_or_default(),
                    row.ip.as_deref().unwrap_or_default(),
                    row.location.as_deref().unwrap_or_default(),
                ))
            })
            .collect();

        if total > 0 && nodes.is_empty() {
            return Err(IngestionError::Malformed {
                feed: Feed::Nodes,
                reason: format!("none of {total} node entries had an id"),
            });
        }
        if nodes.len() < total {
            debug!(skipped = total - nodes.len(), "skipped malformed node rows");
        }

        nodes.sort_by(|a, b| {
            compare_text(a.region(), b.region()).then_with(|| compare_text(a.hostname(), b.hostname()))
        });
        Ok(nodes)
    }

    /// Metric table keyed by node id.
    pub fn normalize_metrics(&self, raw: Vec<RawStatusRow>) -> Result<MetricsTable, IngestionError> {
        let total = raw.len();
        let mut table = MetricsTable::with_capacity(total);
        for row in raw {
            let sid = row.sid.trim();
            if sid.is_empty() {
                continue;
            }
            table.insert(NodeId::from(sid), Self::snapshot(&row));
        }

        if total > 0 && table.is_empty() {
            return Err(IngestionError::Malformed {
                feed: Feed::Metrics,
                reason: format!("none of {total} status rows had an id"),
            });
        }
        Ok(table)
    }

    fn snapshot(row: &RawStatusRow) -> MetricSnapshot {
        let load: Vec<MetricReading> = if row.system_load.trim().is_empty() {
            Vec::new()
        } else {
            row.system_load.split('/').map(reading).collect()
        };
        let mut parts = load.into_iter();

        MetricSnapshot {
            cpu_load: parts.next().unwrap_or_default(),
            io_wait: parts.next().unwrap_or_default(),
            nic_error: parts.next().unwrap_or_default(),
            network: reading(&row.traffic),
            congestion: reading(&row.congestion),
        }
    }

    /// Detail record from a scraped page. Charts are deduplicated per kind
    /// (last one wins) and ordered by their URL score.
    pub fn normalize_detail(&self, raw: RawDetail, fetched_at: DateTime<Utc>) -> DetailRecord {
        let mut charts: Vec<ChartImage> = Vec::new();
        for chart in raw.charts {
            let Some(kind) = chart_kind(&chart.src) else {
                continue;
            };
            let image = ChartImage {
                kind,
                score: chart_score(&chart.src),
                src: chart.src,
                title: chart.title,
            };
            match charts.iter_mut().find(|c| c.kind == kind) {
                Some(existing) => *existing = image,
                None => charts.push(image),
            }
        }
        charts.sort_by_key(|c| c.score);

        DetailRecord {
            uptime: raw.uptime.trim().to_owned(),
            heartbeat: raw.heartbeat.trim().to_owned(),
            private_ip: raw.private_ip.trim().to_owned(),
            price_policy: raw
                .price_policy
                .into_iter()
                .map(|line| line.trim().to_owned())
                .filter(|line| !line.is_empty())
                .collect(),
            charts,
            fetched_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetview_api::RawChart;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::MetricChannel;

    fn raw_node(sid: &str, hostname: &str, location: &str) -> RawNode {
        RawNode {
            sid: Some(sid.into()),
            hostname: Some(hostname.into()),
            ip: Some("1.1.1.1".into()),
            location: Some(location.into()),
        }
    }

    fn status_row(sid: &str, load: &str, traffic: &str, congestion: &str) -> RawStatusRow {
        RawStatusRow {
            sid: sid.into(),
            system_load: load.into(),
            traffic: traffic.into(),
            congestion: congestion.into(),
        }
    }

    #[test]
    fn seoul_google_node() {
        let nodes = Normalizer::default()
            .normalize_nodes(vec![raw_node("1", "node-kr-1", "Seoul (Google)")])
            .unwrap();
        let node = &nodes[0];
        assert_eq!(node.region(), "Seoul");
        assert_eq!(node.provider_brand(), "Google");
        assert_eq!(node.country_code(), "KR");
    }

    #[test]
    fn location_without_parenthetical() {
        assert_eq!(split_location("  Frankfurt "), ("Frankfurt".to_owned(), String::new()));
        assert_eq!(
            split_location("US Dallas (Linode 3)"),
            ("US Dallas".to_owned(), "Linode 3".to_owned())
        );
    }

    #[test]
    fn brand_table_order_and_fallback() {
        let brands = BrandTable::default();
        assert_eq!(derive_brand("LightNode HK", &brands), "LightNode");
        assert_eq!(derive_brand("Linode 4", &brands), "Linode");
        assert_eq!(derive_brand("AWS Lightsail", &brands), "Amazon");
        assert_eq!(derive_brand("DO 2", &brands), "DigitalOcean");
        assert_eq!(derive_brand("Toronto-Host", &brands), "Host");
        assert_eq!(derive_brand("Foo-3", &brands), "Foo");
        assert_eq!(derive_brand("Acme 12", &brands), "Acme");
        assert_eq!(derive_brand("", &brands), "");
    }

    #[test]
    fn injected_brand_rules_take_effect() {
        let brands = BrandTable::new(vec![BrandRule::new("Hetzner", &["hetzner", "hz"])]);
        assert_eq!(derive_brand("HZ Falkenstein", &brands), "Hetzner");
        assert_eq!(derive_brand("Google 2", &brands), "Google");
    }

    #[test]
    fn country_code_precedence() {
        assert_eq!(derive_country("JP Tokyo", "node-kr-1"), "JP");
        assert_eq!(derive_country("Tokyo", "node-jp-2"), "JP");
        assert_eq!(derive_country("Tokyo", "edge-7"), "??");
    }

    #[test]
    fn metric_parse_never_defaults_to_zero() {
        assert_eq!(parse_metric_value("12.5 %"), Some(12.5));
        assert_eq!(parse_metric_value("1,024 MB"), Some(1024.0));
        assert_eq!(parse_metric_value("-"), None);
        assert_eq!(parse_metric_value(""), None);
        assert_eq!(parse_metric_value("—"), None);
    }

    #[test]
    fn rows_without_id_are_skipped() {
        let mut broken = raw_node("", "x", "y");
        broken.sid = None;
        let nodes = Normalizer::default()
            .normalize_nodes(vec![broken, raw_node("2", "node-jp-2", "Tokyo (Vultr)")])
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id().as_str(), "2");
    }

    #[test]
    fn all_malformed_feed_is_rejected() {
        let broken = RawNode::default();
        let err = Normalizer::default().normalize_nodes(vec![broken]).unwrap_err();
        assert_eq!(err.feed(), Feed::Nodes);
    }

    #[test]
    fn empty_feed_is_accepted() {
        assert!(Normalizer::default().normalize_nodes(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn nodes_ordered_by_region_then_hostname() {
        let nodes = Normalizer::default()
            .normalize_nodes(vec![
                raw_node("1", "node-kr-2", "seoul (Google)"),
                raw_node("2", "node-jp-1", "Tokyo (Vultr)"),
                raw_node("3", "node-kr-1", "Seoul (Google)"),
            ])
            .unwrap();
        let ids: Vec<&str> = nodes.iter().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn status_row_channels() {
        let table = Normalizer::default()
            .normalize_metrics(vec![
                status_row("1", "0/0/0", "5", "0"),
                status_row("2", "12.5/-", "", "3"),
            ])
            .unwrap();

        let first = &table[&NodeId::from("1")];
        assert_eq!(first.value(MetricChannel::CpuLoad), Some(0.0));
        assert_eq!(first.value(MetricChannel::Network), Some(5.0));

        let second = &table[&NodeId::from("2")];
        assert_eq!(second.value(MetricChannel::CpuLoad), Some(12.5));
        assert_eq!(second.value(MetricChannel::IoWait), None);
        assert_eq!(second.io_wait.display, "-");
        assert_eq!(second.value(MetricChannel::NicError), None);
        assert_eq!(second.nic_error.display, PLACEHOLDER);
        assert_eq!(second.network.display, PLACEHOLDER);
    }

    #[test]
    fn detail_charts_deduplicated_and_ordered() {
        let raw = RawDetail {
            private_ip: " 10.0.0.1 ".into(),
            uptime: "3 days".into(),
            heartbeat: "now".into(),
            price_policy: vec!["Tier 1".into(), "  ".into()],
            charts: vec![
                RawChart { src: "https://x/mongraph/9_proc.png".into(), title: "Load".into() },
                RawChart { src: "https://x/mongraph/4_eth0.png".into(), title: "Traffic".into() },
                RawChart { src: "https://x/mongraph/2_loadavg.png".into(), title: "Congestion".into() },
                RawChart { src: "https://x/mongraph/7_cpu.png".into(), title: "CPU".into() },
                RawChart { src: "https://x/mongraph/unknown.png".into(), title: "?".into() },
            ],
        };
        let record = Normalizer::default().normalize_detail(raw, Utc::now());
        assert_eq!(record.private_ip, "10.0.0.1");
        assert_eq!(record.price_policy, vec!["Tier 1".to_owned()]);
        let kinds: Vec<(ChartKind, u64)> = record.charts.iter().map(|c| (c.kind, c.score)).collect();
        assert_eq!(
            kinds,
            vec![(ChartKind::Congestion, 2), (ChartKind::Network, 4), (ChartKind::SystemLoad, 7)]
        );
    }
}
