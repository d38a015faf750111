//! `fleetview`: terminal dashboard for browsing fleet nodes.
//!
//! Built on [ratatui](https://ratatui.rs) on top of `fleetview-core`'s
//! [`Controller`](fleetview_core::Controller). The last good node list is
//! served from the local snapshot immediately while a live refresh runs in
//! the background; moving the selection shows the node's detail card.
//!
//! Logs are written to a file (default `/tmp/fleetview.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fleetview_api::FeedClient;
use fleetview_core::{Catalog, Controller, FileStore, KeyValueStore, MemoryStore};

use crate::app::App;

/// Terminal dashboard for the fleet node list.
#[derive(Parser, Debug)]
#[command(name = "fleetview", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short = 'c', long, env = "FLEETVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Feed base URL, overriding the config file
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Label language, overriding the config file
    #[arg(short = 'l', long)]
    locale: Option<String>,

    /// Background refresh period in seconds (0 disables)
    #[arg(long)]
    refresh: Option<u64>,

    /// Directory for the cached snapshot and preferences
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Keep nothing on disk for this session
    #[arg(long)]
    no_cache: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/fleetview.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing; stdout belongs to the TUI. Hold the returned guard
/// for the lifetime of the program so logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fleetview_tui={log_level},fleetview_core={log_level},fleetview_api={log_level}"
        ))
    });

    let log_dir = cli.log_file.parent().unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("fleetview.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Config file, then CLI overrides.
fn load_settings(cli: &Cli) -> Result<fleetview_config::Config> {
    let mut cfg = match &cli.config {
        Some(path) => fleetview_config::load_config_from(path)?,
        None => fleetview_config::load_config_or_default(),
    };
    if let Some(url) = &cli.url {
        cfg.api_base_url.clone_from(url);
    }
    if let Some(locale) = &cli.locale {
        cfg.locale.clone_from(locale);
    }
    if let Some(secs) = cli.refresh {
        cfg.refresh_interval = secs;
    }
    if let Some(dir) = &cli.cache_dir {
        cfg.cache_dir = Some(dir.clone());
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let settings = load_settings(&cli)?;
    let config = fleetview_config::to_controller_config(&settings)?;
    info!(
        base_url = %config.base_url,
        refresh_secs = config.refresh_interval_secs,
        cache_dir = ?config.cache_dir,
        "starting fleetview"
    );

    let client = FeedClient::new(config.base_url.clone(), &config.transport())?;
    let storage: Arc<dyn KeyValueStore> = match (&config.cache_dir, cli.no_cache) {
        (Some(dir), false) => Arc::new(FileStore::new(dir)),
        _ => Arc::new(MemoryStore::new()),
    };

    let catalog = Catalog::english();
    let locales: Vec<String> = catalog.locales().into_iter().map(str::to_owned).collect();
    let controller = Controller::with_translator(config, Arc::new(client), storage, Arc::new(catalog));

    let mut app = App::new(controller, locales);
    app.run().await?;
    Ok(())
}
