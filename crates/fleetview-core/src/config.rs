// ── Runtime configuration ──
//
// Describes where the feeds live and how the engine behaves. The front-end
// builds a `ControllerConfig` (usually from `fleetview-config`) and hands
// it in; core never reads config files.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use fleetview_api::TransportConfig;
use url::Url;

use crate::normalize::BrandTable;

pub const DEFAULT_BASE_URL: &str = "https://mud-server-list.aliceric27.workers.dev";

static DEFAULT_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"));

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Root of the feed endpoints (`/staticnodes`, `/server-status`, ...).
    pub base_url: Url,
    /// Request timeout.
    pub timeout: Duration,
    /// How often to perform a background refresh (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Provider brand recognition rules, first match wins.
    pub brands: BrandTable,
    /// Locale used until the user picks one.
    pub default_locale: String,
    /// Directory for the persisted snapshot and preferences.
    pub cache_dir: Option<PathBuf>,
}

impl ControllerConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 300,
            brands: BrandTable::default(),
            default_locale: "en".to_owned(),
            cache_dir: None,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.timeout)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL.clone())
    }
}
