use std::sync::Arc;

use crate::model::{BrandFilter, FilterState, MetricChannel, MetricsTable, Node};

/// Nodes passing every active predicate, in input order.
///
/// An active ceiling needs a known value on its own channel; a node with
/// no metric snapshot at all fails as soon as any ceiling is active.
pub fn filter(nodes: &[Arc<Node>], metrics: &MetricsTable, state: &FilterState) -> Vec<Arc<Node>> {
    let keyword = state.keyword.trim().to_lowercase();
    nodes
        .iter()
        .filter(|node| matches(node, metrics, state, &keyword))
        .cloned()
        .collect()
}

fn matches(node: &Node, metrics: &MetricsTable, state: &FilterState, keyword: &str) -> bool {
    if let BrandFilter::Brand(brand) = &state.brand {
        if node.provider_brand() != brand {
            return false;
        }
    }

    if !state.countries.is_empty() && !state.countries.contains(node.country_code()) {
        return false;
    }

    let within_ceilings = match metrics.get(node.id()) {
        None => !state.ceilings.any_active(),
        Some(snapshot) => MetricChannel::LOAD_CHANNELS
            .iter()
            .all(|channel| state.ceilings.get(*channel).admits(snapshot.value(*channel))),
    };
    if !within_ceilings {
        return false;
    }

    keyword.is_empty() || node.search_haystack().contains(keyword)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Ceiling, FilterPatch};
    use crate::view::fixtures::{ids, metrics, node};

    fn zeros() -> [Option<f64>; 5] {
        [Some(0.0), Some(0.0), Some(0.0), Some(5.0), Some(0.0)]
    }

    #[test]
    fn cpu_ceiling_zero_keeps_idle_node() {
        let nodes = vec![node("1", "node-kr-1", "Seoul (Google)")];
        let table = metrics(&[("1", zeros())]);

        let mut state = FilterState::default();
        FilterPatch::ceiling(MetricChannel::CpuLoad, Ceiling::from_raw(0.0)).apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["1"]);

        FilterPatch::ceiling(MetricChannel::CpuLoad, Ceiling::from_raw(-1.0)).apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["1"]);
    }

    #[test]
    fn unknown_channel_fails_its_ceiling() {
        let nodes = vec![
            node("1", "node-kr-1", "Seoul (Google)"),
            node("2", "node-kr-2", "Seoul (Google)"),
        ];
        let table = metrics(&[
            ("1", zeros()),
            ("2", [Some(0.0), Some(0.0), None, Some(5.0), Some(0.0)]),
        ]);

        let mut state = FilterState::default();
        FilterPatch::ceiling(MetricChannel::NicError, Ceiling::Max(0.0)).apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["1"]);

        // Only the missing channel matters: a cpu ceiling alone keeps node 2.
        let mut cpu_only = FilterState::default();
        FilterPatch::ceiling(MetricChannel::CpuLoad, Ceiling::Max(0.0)).apply_to(&mut cpu_only);
        assert_eq!(ids(&filter(&nodes, &table, &cpu_only)), vec!["1", "2"]);
    }

    #[test]
    fn missing_snapshot_fails_any_active_ceiling() {
        let nodes = vec![node("1", "node-kr-1", "Seoul (Google)")];
        let table = metrics(&[]);

        assert_eq!(ids(&filter(&nodes, &table, &FilterState::default())), vec!["1"]);

        let mut state = FilterState::default();
        FilterPatch::ceiling(MetricChannel::Congestion, Ceiling::Max(100.0)).apply_to(&mut state);
        assert!(filter(&nodes, &table, &state).is_empty());
    }

    #[test]
    fn brand_country_and_keyword() {
        let nodes = vec![
            node("1", "node-kr-1", "Seoul (Google)"),
            node("2", "node-jp-2", "Tokyo (Vultr)"),
            node("3", "node-jp-3", "Osaka (Google 2)"),
        ];
        let table = metrics(&[]);

        let mut state = FilterState::default();
        FilterPatch::brand(BrandFilter::Brand("Google".into())).apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["1", "3"]);

        FilterPatch::countries(["jp"]).apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["3"]);

        FilterPatch::keyword("OSAKA").apply_to(&mut state);
        assert_eq!(ids(&filter(&nodes, &table, &state)), vec!["3"]);

        FilterPatch::keyword("10.0.0.2").apply_to(&mut state);
        assert!(filter(&nodes, &table, &state).is_empty());
    }

    #[test]
    fn dropping_a_predicate_never_shrinks_the_result() {
        let nodes = vec![
            node("1", "node-kr-1", "Seoul (Google)"),
            node("2", "node-jp-2", "Tokyo (Vultr)"),
            node("3", "node-jp-3", "Osaka (Google)"),
            node("4", "node-us-4", "Dallas (Linode)"),
        ];
        let table = metrics(&[
            ("1", zeros()),
            ("2", [Some(3.0), Some(0.0), Some(0.0), None, Some(1.0)]),
            ("3", [Some(0.0), None, Some(2.0), Some(1.0), Some(0.0)]),
        ]);

        let mut full = FilterState::default();
        FilterPatch {
            brand: Some(BrandFilter::Brand("Google".into())),
            keyword: Some("node".into()),
            cpu_max: Some(Ceiling::Max(1.0)),
            io_max: Some(Ceiling::Max(0.0)),
            nic_max: Some(Ceiling::Max(0.0)),
            congestion_max: Some(Ceiling::Max(0.0)),
            countries: Some(["KR".to_owned(), "JP".to_owned()].into_iter().collect()),
        }
        .apply_to(&mut full);
        let base = filter(&nodes, &table, &full).len();

        let relaxations = [
            FilterPatch::brand(BrandFilter::All),
            FilterPatch::keyword(""),
            FilterPatch::ceiling(MetricChannel::CpuLoad, Ceiling::Inactive),
            FilterPatch::ceiling(MetricChannel::IoWait, Ceiling::Inactive),
            FilterPatch::ceiling(MetricChannel::NicError, Ceiling::Inactive),
            FilterPatch::ceiling(MetricChannel::Congestion, Ceiling::Inactive),
            FilterPatch::countries(Vec::<String>::new()),
        ];
        for patch in relaxations {
            let mut relaxed = full.clone();
            patch.apply_to(&mut relaxed);
            assert!(filter(&nodes, &table, &relaxed).len() >= base);
        }
    }
}
