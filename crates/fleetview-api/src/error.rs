use thiserror::Error;

/// Top-level error type for the `fleetview-api` crate.
///
/// Covers transport failures, unexpected HTTP statuses, and payloads that
/// do not have the shape the feeds are expected to return.
/// `fleetview-core` maps these into ingestion / detail-fetch errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-success HTTP status from a feed endpoint.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The payload parsed, but lacks the structure every feed response has
    /// (missing `staticnodes` array, missing status table, missing detail panel).
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }
}
