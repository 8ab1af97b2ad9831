use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use self::session::SessionConfig;
use self::ui::UiConfig;

pub mod session;
pub mod ui;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub ui: UiConfig,

    /// Emit logs as JSON lines instead of the human readable format
    pub log_json: bool,
    /// Capacity of the session -> backend channel
    pub device_channel_capacity: usize,
    /// Capacity of the backend -> display channel
    pub display_channel_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        Config {
            session: SessionConfig::new(),
            ui: UiConfig::new(),

            log_json: env_or("DATAMAN_LOG_JSON", false),
            device_channel_capacity: env_or("DATAMAN_DEVICE_CHANNEL_CAPACITY", 64),
            display_channel_capacity: env_or("DATAMAN_DISPLAY_CHANNEL_CAPACITY", 16),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            session: SessionConfig::default(),
            ui: UiConfig::default(),
            log_json: false,
            device_channel_capacity: 64,
            display_channel_capacity: 16,
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when it
/// is unset or does not parse
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {key}: {raw:?}");
                default
            }
        },
        Err(_) => default,
    }
}
