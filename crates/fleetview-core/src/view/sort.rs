use std::cmp::Ordering;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::model::{MetricsTable, Node, SortDirection, SortKey, SortState};

/// Case-insensitive text ordering used for every string sort key.
///
/// Lowercase folding only, not collation: non-ASCII text orders by code point.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_ip(a: &str, b: &str) -> Ordering {
    match (a.parse::<Ipv4Addr>(), b.parse::<Ipv4Addr>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => compare_text(a, b),
    }
}

fn provider_label(node: &Node) -> &str {
    if node.provider_brand().is_empty() {
        node.provider()
    } else {
        node.provider_brand()
    }
}

fn compare(a: &Node, b: &Node, key: SortKey, metrics: &MetricsTable) -> Ordering {
    if let Some(channel) = key.metric_channel() {
        // Unknown values sort as the largest possible value.
        let value = |n: &Node| {
            metrics
                .get(n.id())
                .and_then(|s| s.value(channel))
                .unwrap_or(f64::INFINITY)
        };
        return value(a).total_cmp(&value(b));
    }
    match key {
        SortKey::Provider => compare_text(provider_label(a), provider_label(b)),
        SortKey::Ip => compare_ip(a.ipv4(), b.ipv4()),
        SortKey::Id => a.id().numeric().total_cmp(&b.id().numeric()),
        _ => compare_text(a.region(), b.region()),
    }
}

/// Stable ascending sort; descending is the reversed ascending result.
pub fn sort(mut nodes: Vec<Arc<Node>>, metrics: &MetricsTable, state: SortState) -> Vec<Arc<Node>> {
    nodes.sort_by(|a, b| compare(a, b, state.key, metrics));
    if state.direction == SortDirection::Desc {
        nodes.reverse();
    }
    nodes
}
