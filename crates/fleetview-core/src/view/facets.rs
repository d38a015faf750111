use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::Node;
use crate::view::sort::compare_text;

/// Distinct non-empty provider brands, sorted case-insensitively.
pub fn brand_options(nodes: &[Arc<Node>]) -> Vec<String> {
    let mut brands: Vec<String> = nodes
        .iter()
        .map(|n| n.provider_brand())
        .filter(|b| !b.is_empty())
        .map(str::to_owned)
        .collect();
    brands.sort_by(|a, b| compare_text(a, b));
    brands.dedup();
    brands
}

/// Node counts per country code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountryFacets {
    /// `(code, count)` sorted by code.
    pub entries: Vec<(String, usize)>,
    pub total: usize,
}

pub fn country_facets(nodes: &[Arc<Node>]) -> CountryFacets {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in nodes {
        *counts.entry(node.country_code()).or_default() += 1;
    }
    CountryFacets {
        entries: counts.into_iter().map(|(code, n)| (code.to_owned(), n)).collect(),
        total: nodes.len(),
    }
}
