// ── Domain model ──
//
// Typed records produced by the normalizer and consumed by the view
// pipeline, the caches and the front-ends.

pub mod detail;
pub mod metrics;
pub mod node;
pub mod prefs;

pub use detail::{ChartImage, ChartKind, DetailRecord};
pub use metrics::{MetricChannel, MetricReading, MetricSnapshot, MetricsTable, PLACEHOLDER};
pub use node::{Node, NodeId};
pub use prefs::{
    BrandFilter, Ceiling, Ceilings, FilterPatch, FilterState, SortDirection, SortKey, SortState,
    UserPreferences,
};
