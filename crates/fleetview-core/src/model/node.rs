use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::{self, BrandTable};

/// Stable node identifier as delivered by the node feed (`sid`).
///
/// Numeric in practice but kept as a string so no feed value is lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value used by the `id` sort key; non-numeric ids sort as 0.
    pub fn numeric(&self) -> f64 {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One fleet node.
///
/// The derived fields (`region`, `provider`, `provider_brand`,
/// `country_code`) are computed from `raw_location` and `hostname` at
/// construction and cannot be edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    id: NodeId,
    hostname: String,
    ipv4: String,
    raw_location: String,
    region: String,
    provider: String,
    provider_brand: String,
    country_code: String,
}

impl Node {
    pub fn new(
        id: NodeId,
        hostname: impl Into<String>,
        ipv4: impl Into<String>,
        raw_location: impl Into<String>,
        brands: &BrandTable,
    ) -> Self {
        let hostname = hostname.into();
        let raw_location = raw_location.into();
        let (region, provider) = normalize::split_location(&raw_location);
        let provider_brand = normalize::derive_brand(&provider, brands);
        let country_code = normalize::derive_country(&region, &hostname);
        Self {
            id,
            hostname,
            ipv4: ipv4.into(),
            raw_location,
            region,
            provider,
            provider_brand,
            country_code,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ipv4(&self) -> &str {
        &self.ipv4
    }

    pub fn raw_location(&self) -> &str {
        &self.raw_location
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn provider_brand(&self) -> &str {
        &self.provider_brand
    }

    /// Two-letter upper-case country code, `"??"` when undetermined.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Text the keyword filter searches: hostname, ip, region, provider, brand.
    pub fn search_haystack(&self) -> String {
        [
            self.hostname.as_str(),
            self.ipv4.as_str(),
            self.region.as_str(),
            self.provider.as_str(),
            self.provider_brand.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}
