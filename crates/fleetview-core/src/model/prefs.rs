// ── Filter, sort and locale preferences ──

use std::collections::BTreeSet;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::MetricChannel;

/// Provider-brand selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrandFilter {
    #[default]
    All,
    Brand(String),
}

impl BrandFilter {
    /// `"all"` (any case) or empty selects everything.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Brand(trimmed.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Brand(b) => b,
        }
    }
}

/// Upper bound for one load channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ceiling {
    #[default]
    Inactive,
    Max(f64),
}

impl Ceiling {
    /// Negative or non-finite values (the `-1` marker) mean inactive.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_finite() && raw >= 0.0 {
            Self::Max(raw)
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Max(_))
    }

    /// `-1` for inactive, the bound otherwise.
    pub fn to_raw(self) -> f64 {
        match self {
            Self::Inactive => -1.0,
            Self::Max(v) => v,
        }
    }

    /// Whether a reading passes. Unknown readings never pass an active ceiling.
    pub fn admits(self, value: Option<f64>) -> bool {
        match self {
            Self::Inactive => true,
            Self::Max(max) => value.is_some_and(|v| v.is_finite() && v <= max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ceilings {
    pub cpu: Ceiling,
    pub io: Ceiling,
    pub nic: Ceiling,
    pub congestion: Ceiling,
}

impl Ceilings {
    pub fn get(&self, channel: MetricChannel) -> Ceiling {
        match channel {
            MetricChannel::CpuLoad => self.cpu,
            MetricChannel::IoWait => self.io,
            MetricChannel::NicError => self.nic,
            MetricChannel::Congestion => self.congestion,
            MetricChannel::Network => Ceiling::Inactive,
        }
    }

    pub fn any_active(&self) -> bool {
        MetricChannel::LOAD_CHANNELS.iter().any(|c| self.get(*c).is_active())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub brand: BrandFilter,
    pub keyword: String,
    pub ceilings: Ceilings,
    /// Selected country codes; empty means no restriction.
    pub countries: BTreeSet<String>,
}

/// A partial filter update. `None` fields leave the current value alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterPatch {
    pub brand: Option<BrandFilter>,
    pub keyword: Option<String>,
    pub cpu_max: Option<Ceiling>,
    pub io_max: Option<Ceiling>,
    pub nic_max: Option<Ceiling>,
    pub congestion_max: Option<Ceiling>,
    pub countries: Option<BTreeSet<String>>,
}

impl FilterPatch {
    pub fn brand(brand: BrandFilter) -> Self {
        Self {
            brand: Some(brand),
            ..Self::default()
        }
    }

    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub fn ceiling(channel: MetricChannel, ceiling: Ceiling) -> Self {
        let mut patch = Self::default();
        match channel {
            MetricChannel::CpuLoad => patch.cpu_max = Some(ceiling),
            MetricChannel::IoWait => patch.io_max = Some(ceiling),
            MetricChannel::NicError => patch.nic_max = Some(ceiling),
            MetricChannel::Congestion => patch.congestion_max = Some(ceiling),
            MetricChannel::Network => {}
        }
        patch
    }

    pub fn countries<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            countries: Some(codes.into_iter().map(|c| c.into().to_uppercase()).collect()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, state: &mut FilterState) {
        if let Some(brand) = self.brand {
            state.brand = brand;
        }
        if let Some(keyword) = self.keyword {
            state.keyword = keyword.trim().to_owned();
        }
        if let Some(c) = self.cpu_max {
            state.ceilings.cpu = c;
        }
        if let Some(c) = self.io_max {
            state.ceilings.io = c;
        }
        if let Some(c) = self.nic_max {
            state.ceilings.nic = c;
        }
        if let Some(c) = self.congestion_max {
            state.ceilings.congestion = c;
        }
        if let Some(countries) = self.countries {
            state.countries = countries;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum SortKey {
    #[default]
    Region,
    Provider,
    Ip,
    Id,
    CpuLoad,
    IoWait,
    NicError,
    Network,
    Congestion,
}

impl SortKey {
    pub fn metric_channel(self) -> Option<MetricChannel> {
        match self {
            Self::CpuLoad => Some(MetricChannel::CpuLoad),
            Self::IoWait => Some(MetricChannel::IoWait),
            Self::NicError => Some(MetricChannel::NicError),
            Self::Network => Some(MetricChannel::Network),
            Self::Congestion => Some(MetricChannel::Congestion),
            Self::Region | Self::Provider | Self::Ip | Self::Id => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Clicking the active key flips direction; a new key starts ascending.
    #[must_use]
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

/// Everything the user chose that survives a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPreferences {
    pub locale: String,
    pub filter: FilterState,
    pub sort: SortState,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            locale: "en".to_owned(),
            filter: FilterState::default(),
            sort: SortState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ceiling_is_inactive() {
        assert_eq!(Ceiling::from_raw(-1.0), Ceiling::Inactive);
        assert_eq!(Ceiling::from_raw(f64::NAN), Ceiling::Inactive);
        assert_eq!(Ceiling::from_raw(0.0), Ceiling::Max(0.0));
    }

    #[test]
    fn active_ceiling_rejects_unknown() {
        assert!(Ceiling::Inactive.admits(None));
        assert!(Ceiling::Max(0.0).admits(Some(0.0)));
        assert!(!Ceiling::Max(0.0).admits(Some(0.5)));
        assert!(!Ceiling::Max(10.0).admits(None));
    }

    #[test]
    fn sort_toggle() {
        let state = SortState::default();
        let flipped = state.toggle(SortKey::Region);
        assert_eq!(flipped.direction, SortDirection::Desc);
        let other = flipped.toggle(SortKey::CpuLoad);
        assert_eq!(other, SortState::new(SortKey::CpuLoad, SortDirection::Asc));
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut state = FilterState {
            keyword: "tokyo".into(),
            ..FilterState::default()
        };
        FilterPatch::ceiling(MetricChannel::CpuLoad, Ceiling::Max(5.0)).apply_to(&mut state);
        assert_eq!(state.keyword, "tokyo");
        assert_eq!(state.ceilings.cpu, Ceiling::Max(5.0));
        assert!(state.ceilings.any_active());
    }

    #[test]
    fn brand_filter_parse() {
        assert_eq!(BrandFilter::parse("All"), BrandFilter::All);
        assert_eq!(BrandFilter::parse(" Vultr "), BrandFilter::Brand("Vultr".into()));
    }
}
