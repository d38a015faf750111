// ── Persisted snapshot and preferences ──
//
// Best-effort persistence: nothing in here returns an error to the caller.
// Write failures are logged and dropped; unreadable or mis-shaped values
// load as `None` so the caller falls back to a live fetch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kv::KeyValueStore;
use crate::error::StorageError;
use crate::model::{
    BrandFilter, Ceiling, Ceilings, FilterState, MetricSnapshot, MetricsTable, Node, NodeId,
    SortDirection, SortKey, SortState, UserPreferences,
};
use crate::normalize::Normalizer;

pub const SNAPSHOT_KEY: &str = "fleetview_server_cache";
pub const PREFERENCES_KEY: &str = "fleetview_user_filters";

/// A restored node/metric snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub metrics: MetricsTable,
    pub saved_at: DateTime<Utc>,
}

// ── Wire shapes ──────────────────────────────────────────────────────

/// Only the delivered fields are stored; derived fields are recomputed on load.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedNode {
    sid: String,
    hostname: String,
    ip: String,
    location: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSnapshot {
    timestamp: DateTime<Utc>,
    nodes: Vec<PersistedNode>,
    metrics: HashMap<String, MetricSnapshot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSort {
    #[serde(default)]
    key: String,
    #[serde(default)]
    direction: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedPreferences {
    #[serde(default)]
    lang: Option<String>,
    /// Brand selector, `"all"` for no restriction.
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    cpu_max: Option<f64>,
    #[serde(default)]
    io_max: Option<f64>,
    #[serde(default)]
    nic_max: Option<f64>,
    #[serde(default)]
    congestion_max: Option<f64>,
    #[serde(default)]
    country_codes: Vec<String>,
    #[serde(default)]
    sort: Option<PersistedSort>,
}

impl From<&UserPreferences> for PersistedPreferences {
    fn from(prefs: &UserPreferences) -> Self {
        let c = prefs.filter.ceilings;
        Self {
            lang: Some(prefs.locale.clone()),
            location: Some(prefs.filter.brand.as_str().to_owned()),
            keyword: Some(prefs.filter.keyword.clone()),
            cpu_max: Some(c.cpu.to_raw()),
            io_max: Some(c.io.to_raw()),
            nic_max: Some(c.nic.to_raw()),
            congestion_max: Some(c.congestion.to_raw()),
            country_codes: prefs.filter.countries.iter().cloned().collect(),
            sort: Some(PersistedSort {
                key: prefs.sort.key.to_string(),
                direction: prefs.sort.direction.to_string(),
            }),
        }
    }
}

impl PersistedPreferences {
    fn into_preferences(self) -> UserPreferences {
        let defaults = UserPreferences::default();
        let ceiling = |raw: Option<f64>| raw.map_or(Ceiling::Inactive, Ceiling::from_raw);
        let sort = self.sort.unwrap_or_default();

        UserPreferences {
            locale: self
                .lang
                .filter(|l| !l.trim().is_empty())
                .unwrap_or(defaults.locale),
            filter: FilterState {
                brand: self
                    .location
                    .as_deref()
                    .map_or(BrandFilter::All, BrandFilter::parse),
                keyword: self.keyword.unwrap_or_default().trim().to_owned(),
                ceilings: Ceilings {
                    cpu: ceiling(self.cpu_max),
                    io: ceiling(self.io_max),
                    nic: ceiling(self.nic_max),
                    congestion: ceiling(self.congestion_max),
                },
                countries: self
                    .country_codes
                    .into_iter()
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty())
                    .collect::<BTreeSet<_>>(),
            },
            sort: SortState {
                key: sort.key.parse::<SortKey>().unwrap_or(defaults.sort.key),
                direction: if sort.direction == "desc" {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            },
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Reads and writes the node/metric snapshot and the user preferences.
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KeyValueStore>,
    normalizer: Normalizer,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, normalizer: Normalizer) -> Self {
        Self { kv, normalizer }
    }

    /// Persist the node and metric tables. Failures are logged, never returned.
    pub fn save(&self, nodes: &[Arc<Node>], metrics: &MetricsTable) {
        self.save_at(nodes, metrics, Utc::now());
    }

    pub fn save_at(&self, nodes: &[Arc<Node>], metrics: &MetricsTable, timestamp: DateTime<Utc>) {
        let payload = PersistedSnapshot {
            timestamp,
            nodes: nodes
                .iter()
                .map(|n| PersistedNode {
                    sid: n.id().to_string(),
                    hostname: n.hostname().to_owned(),
                    ip: n.ipv4().to_owned(),
                    location: n.raw_location().to_owned(),
                })
                .collect(),
            metrics: metrics
                .iter()
                .map(|(id, snapshot)| (id.to_string(), snapshot.clone()))
                .collect(),
        };
        if let Err(e) = self.write(SNAPSHOT_KEY, &payload) {
            warn!(error = %e, "failed to persist node snapshot");
        }
    }

    /// Restore the last snapshot, or `None` if it is missing or malformed.
    pub fn load(&self) -> Option<Snapshot> {
        let persisted: PersistedSnapshot = self.read(SNAPSHOT_KEY)?;

        let mut nodes = Vec::with_capacity(persisted.nodes.len());
        for raw in persisted.nodes {
            if raw.sid.trim().is_empty() {
                debug!("cached snapshot has a node without id, ignoring cache");
                return None;
            }
            nodes.push(self.normalizer.node(
                NodeId::from(raw.sid.trim()),
                &raw.hostname,
                &raw.ip,
                &raw.location,
            ));
        }

        Some(Snapshot {
            nodes,
            metrics: persisted
                .metrics
                .into_iter()
                .map(|(id, snapshot)| (NodeId::from(id), snapshot))
                .collect(),
            saved_at: persisted.timestamp,
        })
    }

    pub fn save_preferences(&self, prefs: &UserPreferences) {
        if let Err(e) = self.write(PREFERENCES_KEY, &PersistedPreferences::from(prefs)) {
            warn!(error = %e, "failed to persist user preferences");
        }
    }

    /// Restore preferences; unknown or missing fields take their defaults.
    pub fn load_preferences(&self) -> Option<UserPreferences> {
        self.read::<PersistedPreferences>(PREFERENCES_KEY)
            .map(PersistedPreferences::into_preferences)
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.kv.set(key, &json)
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read persisted state");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "persisted value has unexpected shape");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{FilterPatch, MetricChannel};
    use crate::store::MemoryStore;
    use crate::view::fixtures::{node, snapshot};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io {
                key: key.to_owned(),
                source: std::io::Error::other("disk gone"),
            })
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            self.get(key).map(|_| ())
        }
    }

    fn store() -> (Arc<MemoryStore>, SnapshotStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = SnapshotStore::new(kv.clone(), Normalizer::default());
        (kv, store)
    }

    #[test]
    fn snapshot_restores_with_derived_fields() {
        let (_, store) = store();
        let nodes = vec![node("1", "node-kr-1", "Seoul (Google)")];
        let metrics: MetricsTable = [(NodeId::from("1"), snapshot([Some(0.0), None, Some(1.0), Some(5.0), None]))]
            .into_iter()
            .collect();

        store.save(&nodes, &metrics);
        let restored = store.load().unwrap();

        assert_eq!(restored.nodes.len(), 1);
        assert_eq!(restored.nodes[0], *nodes[0]);
        assert_eq!(restored.nodes[0].provider_brand(), "Google");
        assert_eq!(restored.metrics, metrics);
    }

    #[test]
    fn missing_or_malformed_snapshot_loads_none() {
        let (kv, store) = store();
        assert!(store.load().is_none());

        kv.set(SNAPSHOT_KEY, "not json").unwrap();
        assert!(store.load().is_none());

        kv.set(SNAPSHOT_KEY, r#"{"nodes": []}"#).unwrap();
        assert!(store.load().is_none());

        kv.set(
            SNAPSHOT_KEY,
            r#"{"timestamp":"2024-01-01T00:00:00Z","nodes":[{"sid":"","hostname":"","ip":"","location":""}],"metrics":{}}"#,
        )
        .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let store = SnapshotStore::new(Arc::new(BrokenStore), Normalizer::default());
        store.save(&[node("1", "node-kr-1", "Seoul (Google)")], &MetricsTable::new());
        store.save_preferences(&UserPreferences::default());
        assert!(store.load().is_none());
        assert!(store.load_preferences().is_none());
    }

    #[test]
    fn preferences_round_trip() {
        let (_, store) = store();
        let mut prefs = UserPreferences {
            locale: "ja".into(),
            sort: SortState::new(SortKey::CpuLoad, SortDirection::Desc),
            ..UserPreferences::default()
        };
        FilterPatch::ceiling(MetricChannel::NicError, Ceiling::Max(0.0)).apply_to(&mut prefs.filter);
        FilterPatch::countries(["kr", "JP"]).apply_to(&mut prefs.filter);
        FilterPatch::brand(BrandFilter::Brand("Vultr".into())).apply_to(&mut prefs.filter);

        store.save_preferences(&prefs);
        assert_eq!(store.load_preferences().unwrap(), prefs);
    }

    #[test]
    fn preferences_fill_defaults() {
        let (kv, store) = store();
        kv.set(
            PREFERENCES_KEY,
            r#"{"cpuMax": -1, "ioMax": 3, "sort": {"key": "bogus", "direction": "DESC"}}"#,
        )
        .unwrap();
        let prefs = store.load_preferences().unwrap();
        assert_eq!(prefs.locale, "en");
        assert_eq!(prefs.filter.ceilings.cpu, Ceiling::Inactive);
        assert_eq!(prefs.filter.ceilings.io, Ceiling::Max(3.0));
        assert_eq!(prefs.sort, SortState::default());
    }
}
