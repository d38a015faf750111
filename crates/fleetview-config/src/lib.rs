//! Shared configuration for fleetview front-ends.
//!
//! A single TOML file plus `FLEETVIEW_*` environment overrides, translated
//! to `fleetview_core::ControllerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetview_core::config::DEFAULT_BASE_URL;
use fleetview_core::{BrandTable, ControllerConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Root of the feed endpoints.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Background refresh period in seconds; 0 disables it.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Label language used until the user picks one.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Where the snapshot and preferences live. Defaults to the
    /// platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Replaces the built-in provider brand rules when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<BrandTable>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            locale: default_locale(),
            cache_dir: None,
            brands: None,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    300
}
fn default_locale() -> String {
    "en".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "fleetview", "fleetview")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform cache directory for the persisted snapshot.
pub fn default_cache_dir() -> PathBuf {
    project_dirs().map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("cache");
            p
        },
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetview");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLEETVIEW_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning the defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the engine configuration, validating the user-supplied values.
pub fn to_controller_config(cfg: &Config) -> Result<ControllerConfig, ConfigError> {
    let base_url: url::Url = cfg.api_base_url.trim().parse().map_err(|_| ConfigError::Validation {
        field: "api_base_url".into(),
        reason: format!("invalid URL: {}", cfg.api_base_url),
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_base_url".into(),
            reason: format!("unsupported scheme '{}'", base_url.scheme()),
        });
    }
    if cfg.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let locale = cfg.locale.trim();
    if locale.is_empty() {
        return Err(ConfigError::Validation {
            field: "locale".into(),
            reason: "must not be empty".into(),
        });
    }

    Ok(ControllerConfig {
        base_url,
        timeout: Duration::from_secs(cfg.timeout),
        refresh_interval_secs: cfg.refresh_interval,
        brands: cfg.brands.clone().unwrap_or_default(),
        default_locale: locale.to_owned(),
        cache_dir: Some(cfg.cache_dir.clone().unwrap_or_else(default_cache_dir)),
    })
}
