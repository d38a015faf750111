// ── Core error types ──
//
// The engine distinguishes whole-feed failures (ingestion), per-node
// detail failures, and storage failures. Consumers never see raw HTTP
// or scraping errors; the `From<fleetview_api::Error>` impls translate
// them at the source boundary.

use thiserror::Error;

use crate::model::NodeId;

/// Which bulk feed an ingestion error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Feed {
    Nodes,
    Metrics,
}

/// A bulk feed could not be fetched or had no usable content.
///
/// The refresh cycle that hit it is aborted; previously committed
/// tables stay authoritative.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("{feed} feed unreachable: {reason}")]
    Unreachable { feed: Feed, reason: String },

    #[error("{feed} feed rejected: {reason}")]
    Malformed { feed: Feed, reason: String },
}

impl IngestionError {
    pub fn feed(&self) -> Feed {
        match self {
            Self::Unreachable { feed, .. } | Self::Malformed { feed, .. } => *feed,
        }
    }

    /// Classify a transport-layer error for the given feed.
    pub fn from_api(feed: Feed, err: &fleetview_api::Error) -> Self {
        match err {
            fleetview_api::Error::Transport(_)
            | fleetview_api::Error::Status { .. }
            | fleetview_api::Error::InvalidUrl(_) => Self::Unreachable {
                feed,
                reason: err.to_string(),
            },
            fleetview_api::Error::Deserialization { .. }
            | fleetview_api::Error::UnexpectedShape(_) => Self::Malformed {
                feed,
                reason: err.to_string(),
            },
        }
    }
}

/// A single node's detail page could not be loaded.
///
/// `Clone` because one failure is delivered to every caller that was
/// awaiting the same in-flight fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetailFetchError {
    #[error("detail source unreachable for node {id}: {reason}")]
    Unreachable { id: NodeId, reason: String },

    #[error("no detail page for node {id}")]
    NotFound { id: NodeId },

    #[error("detail page for node {id} is malformed: {reason}")]
    Malformed { id: NodeId, reason: String },
}

impl DetailFetchError {
    pub fn from_api(id: &NodeId, err: &fleetview_api::Error) -> Self {
        if err.is_not_found() {
            return Self::NotFound { id: id.clone() };
        }
        match err {
            fleetview_api::Error::Deserialization { .. }
            | fleetview_api::Error::UnexpectedShape(_) => Self::Malformed {
                id: id.clone(),
                reason: err.to_string(),
            },
            _ => Self::Unreachable {
                id: id.clone(),
                reason: err.to_string(),
            },
        }
    }
}

/// Durable storage failure. Never escapes `SnapshotStore`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_unreachable() {
        let err = fleetview_api::Error::Status {
            url: "https://feeds.example.net/staticnodes".into(),
            status: 502,
        };
        let ingestion = IngestionError::from_api(Feed::Nodes, &err);
        assert!(matches!(ingestion, IngestionError::Unreachable { feed: Feed::Nodes, .. }));
        assert!(ingestion.to_string().starts_with("nodes feed unreachable"));
    }

    #[test]
    fn shape_errors_are_malformed() {
        let err = fleetview_api::Error::UnexpectedShape("no table".into());
        assert_eq!(IngestionError::from_api(Feed::Metrics, &err).feed(), Feed::Metrics);

        let detail = DetailFetchError::from_api(&NodeId::from("7"), &err);
        assert!(matches!(detail, DetailFetchError::Malformed { .. }));
    }

    #[test]
    fn missing_detail_page_is_not_found() {
        let err = fleetview_api::Error::Status {
            url: "https://feeds.example.net/server-status/7".into(),
            status: 404,
        };
        assert_eq!(
            DetailFetchError::from_api(&NodeId::from("7"), &err),
            DetailFetchError::NotFound { id: NodeId::from("7") }
        );
    }
}
