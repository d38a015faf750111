// ── View pipeline ──
//
// Pure functions from the committed tables plus filter/sort state to the
// desired ordered view. Nothing here touches shared state.

pub mod facets;
pub mod filter;
pub mod sort;

use std::sync::Arc;

use crate::model::{MetricChannel, MetricsTable, Node, SortDirection, SortKey, SortState, UserPreferences};

pub use facets::{CountryFacets, brand_options, country_facets};
pub use filter::filter;
pub use sort::{compare_text, sort};

/// Filter then sort.
pub fn desired_view(nodes: &[Arc<Node>], metrics: &MetricsTable, prefs: &UserPreferences) -> Vec<Arc<Node>> {
    sort(filter(nodes, metrics, &prefs.filter), metrics, prefs.sort)
}

/// Sort state the best-server preset switches to.
pub const BEST_SERVER_SORT: SortState = SortState {
    key: SortKey::Network,
    direction: SortDirection::Asc,
};

/// Of the already filtered nodes, keep those whose load channels are all
/// known and exactly zero, ordered by network traffic ascending.
pub fn best_servers(filtered: Vec<Arc<Node>>, metrics: &MetricsTable) -> Vec<Arc<Node>> {
    let idle: Vec<Arc<Node>> = filtered
        .into_iter()
        .filter(|node| {
            metrics.get(node.id()).is_some_and(|snapshot| {
                MetricChannel::LOAD_CHANNELS
                    .iter()
                    .all(|c| snapshot.value(*c).is_some_and(|v| v.abs() < f64::EPSILON))
            })
        })
        .collect();
    sort(idle, metrics, BEST_SERVER_SORT)
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::fixtures::{ids, metrics, node};
    use super::*;

    #[test]
    fn best_servers_require_all_zero_load() {
        let nodes = vec![
            node("1", "node-kr-1", "Seoul (Google)"),
            node("2", "node-kr-2", "Seoul (Google)"),
            node("3", "node-jp-3", "Tokyo (Vultr)"),
            node("4", "node-jp-4", "Tokyo (Vultr)"),
        ];
        let table = metrics(&[
            ("1", [Some(0.0), Some(0.0), Some(0.0), Some(50.0), Some(0.0)]),
            ("2", [Some(0.0), Some(0.0), None, Some(1.0), Some(0.0)]),
            ("3", [Some(0.0), Some(0.0), Some(0.0), Some(10.0), Some(0.0)]),
            ("4", [Some(1.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0)]),
        ]);
        assert_eq!(ids(&best_servers(nodes, &table)), vec!["3", "1"]);
    }
}
