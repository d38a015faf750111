// ── Committed node/metric tables ──
//
// The node table and metric map are only ever replaced together, in one
// atomic swap. Readers grab an `Arc` to whichever pair is current and
// never observe a half-applied refresh.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use crate::model::{MetricsTable, Node};

/// Where the committed tables came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TableSource {
    Cache,
    Live,
}

/// One consistent node table plus its metric map.
#[derive(Debug, Clone)]
pub struct FleetTables {
    pub nodes: Vec<Arc<Node>>,
    pub metrics: MetricsTable,
    /// When the data was fetched (for cached data, when it was saved).
    pub as_of: DateTime<Utc>,
    pub source: TableSource,
}

impl FleetTables {
    pub fn new(nodes: Vec<Node>, metrics: MetricsTable, as_of: DateTime<Utc>, source: TableSource) -> Self {
        Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
            metrics,
            as_of,
            source,
        }
    }
}

/// Holder of the currently committed tables.
pub struct DataStore {
    current: ArcSwapOption<FleetTables>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Replace the committed tables wholesale.
    pub fn commit(&self, tables: FleetTables) -> Arc<FleetTables> {
        let tables = Arc::new(tables);
        self.current.store(Some(Arc::clone(&tables)));
        tables
    }

    pub fn current(&self) -> Option<Arc<FleetTables>> {
        self.current.load_full()
    }

    pub fn has_data(&self) -> bool {
        self.current.load().is_some()
    }
}
