use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::env_or;

fn default_display_width() -> u32 {
    640
}

fn default_display_height() -> u32 {
    480
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Width of the region the result image is fitted into
    #[serde(default = "default_display_width")]
    pub display_width: u32,
    #[serde(default = "default_display_height")]
    pub display_height: u32,
    /// Run without a window; results are logged instead
    pub headless: bool,
    /// Headless only: where the last composed image is written as PNG
    pub snapshot_path: Option<PathBuf>,
}

impl UiConfig {
    pub fn new() -> Self {
        Self {
            display_width: env_or("DATAMAN_DISPLAY_WIDTH", default_display_width()).max(1),
            display_height: env_or("DATAMAN_DISPLAY_HEIGHT", default_display_height()).max(1),
            headless: env_or("DATAMAN_HEADLESS", false),
            snapshot_path: env::var_os("DATAMAN_SNAPSHOT_PATH").map(PathBuf::from),
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            display_width: default_display_width(),
            display_height: default_display_height(),
            headless: false,
            snapshot_path: None,
        }
    }
}
