use std::path::PathBuf;

use dataman_core::{SessionError, SystemDiscoverer};
use dataman_types::SystemInfo;

/// Reports one system per replay directory that exists
pub struct ReplayDiscoverer {
    dirs: Vec<PathBuf>,
    baud_rate: u32,
}

impl ReplayDiscoverer {
    pub fn new(dirs: Vec<PathBuf>, baud_rate: u32) -> Self {
        Self { dirs, baud_rate }
    }
}

impl SystemDiscoverer for ReplayDiscoverer {
    fn discover(&self) -> Result<Vec<SystemInfo>, SessionError> {
        let systems: Vec<SystemInfo> = self
            .dirs
            .iter()
            .filter(|dir| dir.is_dir())
            .map(|dir| SystemInfo {
                name: dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "replay".to_string()),
                port_name: dir.display().to_string(),
                baud_rate: self.baud_rate,
            })
            .collect();

        for system in &systems {
            tracing::info!("Device found: {}, port={}", system.name, system.port_name);
        }

        if systems.is_empty() {
            return Err(SessionError::Discovery(format!(
                "no replay directory found among {:?}",
                self.dirs
            )));
        }

        Ok(systems)
    }
}
