//! Runtime configuration assembled from the command line and the environment.

use std::time::Duration;

use crate::Cli;

/// Environment variables checked for the StormGlass API key, in order
pub const API_KEY_VARS: [&str; 2] = ["STORMGLASS_API_KEY", "REACT_APP_STORMGLASS_API_KEY"];

/// StormGlass point forecast endpoint
pub const STORMGLASS_POINT_URL: &str = "https://api.stormglass.io/v2/weather/point";

/// Lower bound for the playback tick
const MIN_TICK_MS: u64 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Fixed playback tick period
    pub tick_interval: Duration,
    /// Frontend origin allowed by CORS
    pub cors_origin: String,
    pub stormglass_api_key: Option<String>,
    pub stormglass_url: String,
}

impl Config {
    /// Build the configuration, reading the API key from the process environment
    pub fn from_cli(args: &Cli) -> Self {
        Self::from_cli_with_env(args, |name| std::env::var(name).ok())
    }

    /// Build the configuration with a custom environment lookup
    pub fn from_cli_with_env<F>(args: &Cli, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let stormglass_api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| env(name))
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty());

        if args.tick_ms < MIN_TICK_MS {
            log::warn!(
                "Tick interval {} ms is too short, using {} ms",
                args.tick_ms,
                MIN_TICK_MS
            );
        }

        Config {
            port: args.port,
            tick_interval: Duration::from_millis(args.tick_ms.max(MIN_TICK_MS)),
            cors_origin: args.cors_origin.clone(),
            stormglass_api_key,
            stormglass_url: STORMGLASS_POINT_URL.to_string(),
        }
    }
}
