// fleetview-core: Sync, cache and view-reconciliation engine between fleetview-api and front-ends.

pub mod config;
pub mod controller;
pub mod detail;
pub mod error;
pub mod i18n;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ControllerConfig;
pub use controller::{Controller, OrderedView, ViewState};
pub use detail::{DetailRow, HoverCard, SubscriptionState};
pub use error::{CoreError, DetailFetchError, Feed, IngestionError, StorageError};
pub use i18n::{Catalog, Translator};
pub use normalize::{BrandRule, BrandTable, Normalizer};
pub use reconcile::{Patch, RenderedRow, RowContent, RowHandle};
pub use source::{DetailSource, FleetSource, MetricsSource, NodeSource};
pub use store::{DataStore, FileStore, KeyValueStore, MemoryStore, TableSource};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Fleet
    Node, NodeId,
    // Metrics
    MetricChannel, MetricReading, MetricSnapshot, MetricsTable, PLACEHOLDER,
    // Detail
    ChartImage, ChartKind, DetailRecord,
    // Preferences
    BrandFilter, Ceiling, Ceilings, FilterPatch, FilterState, SortDirection, SortKey, SortState,
    UserPreferences,
};
