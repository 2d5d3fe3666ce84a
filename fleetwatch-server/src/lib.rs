//! # Fleetwatch Server
//!
//! Vessel geofence monitor with REST API and WebSocket support.
//!
//! This crate provides a complete monitoring server that:
//! - Accepts vessel tracks as CSV uploads
//! - Lets operators draw restricted zones and toggle them
//! - Plays every vessel back on a fixed tick and raises zone-entry alerts
//! - Streams alerts via WebSocket
//! - Proxies marine weather lookups to StormGlass
//!
//! ## Architecture
//!
//! The server is built on top of [`fleetwatch_core`] for the monitoring
//! logic, with [`tokio`] providing the async runtime.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  fleetwatch-server                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐ │
//! │  │ REST API    │  │ WebSocket   │  │ Weather proxy    │ │
//! │  │ (axum)      │  │ (alerts)    │  │ (reqwest)        │ │
//! │  └──────┬──────┘  └──────▲──────┘  └──────────────────┘ │
//! │         │                │                              │
//! │         ▼                │ broadcast                    │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │          SharedEngine (Arc<RwLock<MonitorEngine>>)  ││
//! │  └─────────────────────────────────────────────────────┘│
//! │         ▲                                               │
//! │  ┌──────┴──────────────────────────────────────────────┐│
//! │  │  Scheduler: one tick for all playing vessels        ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Session`] - Main application state container
//! - [`scheduler::Scheduler`] - Fixed-interval playback loop
//! - [`web::Web`] - HTTP server and route handlers
//! - [`weather::WeatherProxy`] - StormGlass relay
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-p, --port` - HTTP server port (default: 4000)
//! - `-t, --tick-ms` - Playback tick period (default: 500)
//! - `--track` - Load a CSV track at startup (repeatable)
//! - `--autoplay` - Start playback of loaded tracks immediately
//! - `-v` - Increase verbosity (use multiple times)

extern crate tokio;

use clap::Parser;
use fleetwatch_core::{AlertRecord, MonitorEngine};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

pub mod config;
pub mod scheduler;
pub mod weather;
pub mod web;

pub use config::Config;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capacity of the alert broadcast channel; slow subscribers skip ahead
const ALERT_CHANNEL_CAPACITY: usize = 256;

/// Shared monitor engine. The scheduler and the web handlers both lock it.
pub type SharedEngine = Arc<RwLock<MonitorEngine>>;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 4000)]
    pub port: u16,

    /// Playback tick period in milliseconds
    #[arg(short, long, default_value_t = 500)]
    pub tick_ms: u64,

    /// Frontend origin allowed to call the API
    #[arg(long, default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Load a vessel track (CSV: latitude,longitude,type) at startup.
    /// The file name becomes the vessel name.
    #[arg(long)]
    pub track: Vec<PathBuf>,

    /// Start playback of all loaded tracks immediately
    #[arg(long, default_value_t = false)]
    pub autoplay: bool,
}

pub struct SessionInner {
    pub config: Config,
    pub engine: SharedEngine,
    pub tx_alerts: broadcast::Sender<AlertRecord>,
}

#[derive(Clone)]
pub struct Session {
    pub inner: Arc<RwLock<SessionInner>>,
}

impl Session {
    pub fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, SessionInner>, PoisonError<RwLockReadGuard<'_, SessionInner>>>
    {
        self.inner.read()
    }

    pub fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, SessionInner>, PoisonError<RwLockWriteGuard<'_, SessionInner>>>
    {
        self.inner.write()
    }

    pub fn new(args: Cli) -> Self {
        Self::with_config(Config::from_cli(&args))
    }

    #[cfg(test)]
    pub fn new_fake() -> Self {
        // No environment lookups, so tests never see a real API key
        let args = Cli::parse_from(["fleetwatch-server"]);
        Self::with_config(Config::from_cli_with_env(&args, |_| None))
    }

    pub fn with_config(config: Config) -> Self {
        let (tx_alerts, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Session {
            inner: Arc::new(RwLock::new(SessionInner {
                config,
                engine: Arc::new(RwLock::new(MonitorEngine::new())),
                tx_alerts,
            })),
        }
    }

    pub fn config(&self) -> Config {
        self.read().unwrap().config.clone()
    }

    pub fn engine(&self) -> SharedEngine {
        self.read().unwrap().engine.clone()
    }

    pub fn alerts_sender(&self) -> broadcast::Sender<AlertRecord> {
        self.read().unwrap().tx_alerts.clone()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertRecord> {
        self.read().unwrap().tx_alerts.subscribe()
    }

    /// Load CSV track files into the engine. Unreadable or empty files are
    /// logged and skipped. Returns the ids of the vessels created.
    pub fn load_track_files(&self, paths: &[PathBuf]) -> Vec<u32> {
        let engine = self.engine();
        let mut ids = Vec::new();

        for path in paths {
            let csv = match std::fs::read_to_string(path) {
                Ok(csv) => csv,
                Err(e) => {
                    log::warn!("Cannot read track file {}: {}", path.display(), e);
                    continue;
                }
            };
            let name = vessel_name_from_path(path);
            match engine.write().unwrap().add_vessel_csv(name.as_deref(), &csv) {
                Ok(import) => {
                    log::info!(
                        "Loaded track {} as vessel {}",
                        path.display(),
                        import.vessel_id
                    );
                    log::debug!(
                        "Track {}: {} rows accepted, {} dropped",
                        path.display(),
                        import.accepted,
                        import.dropped
                    );
                    ids.push(import.vessel_id);
                }
                Err(e) => log::warn!("Ignoring track file {}: {}", path.display(), e),
            }
        }

        ids
    }
}

fn vessel_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session {{ }}")
    }
}
