use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::i18n::Translator;
use crate::model::{ChartImage, DetailRecord, MetricChannel, MetricSnapshot, Node, PLACEHOLDER};

/// One labelled line of a hover card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

impl DetailRow {
    fn new(label: String, value: &str) -> Self {
        let value = value.trim();
        Self {
            label,
            value: if value.is_empty() {
                PLACEHOLDER.to_owned()
            } else {
                value.to_owned()
            },
        }
    }
}

/// What the UI shows for the hovered/focused row.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverCard {
    pub node: Arc<Node>,
    pub rows: Vec<DetailRow>,
    pub charts: Vec<ChartImage>,
    pub fetched_at: DateTime<Utc>,
}

impl HoverCard {
    pub fn build(
        node: Arc<Node>,
        metrics: Option<&MetricSnapshot>,
        detail: &DetailRecord,
        translator: &dyn Translator,
        locale: &str,
    ) -> Self {
        Self {
            rows: detail_rows(&node, metrics, detail, translator, locale),
            charts: detail.charts.clone(),
            fetched_at: detail.fetched_at,
            node,
        }
    }
}

/// Hover card lines: addresses, uptime, heartbeat, price policy, the
/// current metric texts, one line per chart and a fetched-at footer.
pub fn detail_rows(
    node: &Node,
    metrics: Option<&MetricSnapshot>,
    detail: &DetailRecord,
    translator: &dyn Translator,
    locale: &str,
) -> Vec<DetailRow> {
    let label = |path: &str| translator.t(locale, path, &[]);

    let mut rows = vec![
        DetailRow::new(label("hover.labels.ipv4"), node.ipv4()),
        DetailRow::new(label("hover.labels.privateIp"), &detail.private_ip),
        DetailRow::new(label("hover.labels.uptime"), &detail.uptime),
        DetailRow::new(label("hover.labels.heartbeat"), &detail.heartbeat),
    ];

    if !detail.price_policy.is_empty() {
        rows.push(DetailRow::new(
            label("hover.labels.pricePolicy"),
            &detail.price_policy.join("\n"),
        ));
    }

    if let Some(snapshot) = metrics {
        for channel in [
            MetricChannel::CpuLoad,
            MetricChannel::IoWait,
            MetricChannel::NicError,
            MetricChannel::Network,
            MetricChannel::Congestion,
        ] {
            rows.push(DetailRow::new(
                label(&format!("hover.labels.{channel}")),
                &snapshot.get(channel).rendered(channel),
            ));
        }
    }

    for chart in &detail.charts {
        rows.push(DetailRow::new(
            label(&format!("metricImageLabels.{}", chart.kind)),
            &chart.src,
        ));
    }

    rows.push(DetailRow::new(
        label("hover.fetchTimePrefix"),
        &detail.fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ));
    rows
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::i18n::Catalog;
    use crate::model::ChartKind;
    use crate::view::fixtures::{node, snapshot};

    fn record() -> DetailRecord {
        DetailRecord {
            uptime: "3 days".into(),
            heartbeat: String::new(),
            private_ip: "10.0.0.9".into(),
            price_policy: Vec::new(),
            charts: vec![ChartImage {
                kind: ChartKind::Network,
                src: "https://x/mongraph/1_eth0.png".into(),
                title: "Traffic".into(),
                score: 1,
            }],
            fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default(),
        }
    }

    #[test]
    fn rows_without_metrics() {
        let n = node("1", "node-kr-1", "Seoul (Google)");
        let rows = detail_rows(&n, None, &record(), &Catalog::english(), "en");
        let pairs: Vec<(&str, &str)> = rows.iter().map(|r| (r.label.as_str(), r.value.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("IPv4", "10.0.0.1"),
                ("Private IP", "10.0.0.9"),
                ("Uptime", "3 days"),
                ("Heartbeat", PLACEHOLDER),
                ("Traffic Trend", "https://x/mongraph/1_eth0.png"),
                ("Fetched at", "2024-05-01 12:00:00 UTC"),
            ]
        );
    }

    #[test]
    fn rows_with_metrics_and_price_policy() {
        let n = node("1", "node-kr-1", "Seoul (Google)");
        let mut detail = record();
        detail.price_policy = vec!["Tier 1".into(), "Tier 2".into()];
        let snap = snapshot([Some(1.0), None, Some(0.0), Some(5.0), Some(2.0)]);

        let rows = detail_rows(&n, Some(&snap), &detail, &Catalog::english(), "en");
        assert_eq!(rows[4], DetailRow { label: "Price Policy".into(), value: "Tier 1\nTier 2".into() });
        assert_eq!(rows[6], DetailRow { label: "IO Wait %".into(), value: PLACEHOLDER.into() });
        assert_eq!(rows[8], DetailRow { label: "Traffic (MB)".into(), value: "5 MB".into() });
        assert_eq!(rows.len(), 12);
    }
}
