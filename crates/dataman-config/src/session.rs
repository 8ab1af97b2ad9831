use std::env;
use std::path::PathBuf;

use dataman_types::{ResultType, ResultTypes};
use serde::{Deserialize, Serialize};

use crate::env_or;

fn default_result_types() -> Vec<ResultType> {
    vec![
        ResultType::ReadXml,
        ResultType::Image,
        ResultType::ImageGraphics,
    ]
}

fn default_text_encoding() -> String {
    "utf-8".to_string()
}

fn default_replay_dir() -> PathBuf {
    PathBuf::from("replay")
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_trigger_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Result kinds requested from the reader
    #[serde(default = "default_result_types")]
    pub result_types: Vec<ResultType>,
    /// Label of the encoding used for base64 read strings (WHATWG label)
    #[serde(default = "default_text_encoding")]
    pub text_encoding: String,
    #[serde(default = "default_replay_dir")]
    pub replay_dir: PathBuf,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Delay between two replayed trigger cycles
    #[serde(default = "default_trigger_interval_ms")]
    pub trigger_interval_ms: u64,
    pub replay_repeat: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        let result_types = match env::var("DATAMAN_RESULT_TYPES") {
            Ok(raw) => parse_result_types(&raw).unwrap_or_else(|e| {
                tracing::warn!("{e}, using default result types");
                default_result_types()
            }),
            Err(_) => default_result_types(),
        };

        let text_encoding =
            env::var("DATAMAN_TEXT_ENCODING").unwrap_or_else(|_| default_text_encoding());

        let replay_dir = env::var_os("DATAMAN_REPLAY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_replay_dir);

        Self {
            result_types,
            text_encoding,
            replay_dir,
            baud_rate: env_or("DATAMAN_BAUD_RATE", default_baud_rate()),
            trigger_interval_ms: env_or(
                "DATAMAN_TRIGGER_INTERVAL_MS",
                default_trigger_interval_ms(),
            ),
            replay_repeat: env_or("DATAMAN_REPLAY_REPEAT", false),
        }
    }

    pub fn result_types_mask(&self) -> ResultTypes {
        self.result_types.iter().copied().collect()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            result_types: default_result_types(),
            text_encoding: default_text_encoding(),
            replay_dir: default_replay_dir(),
            baud_rate: default_baud_rate(),
            trigger_interval_ms: default_trigger_interval_ms(),
            replay_repeat: false,
        }
    }
}

/// Parse a comma separated list of result kinds, e.g. `read_xml,image`
pub fn parse_result_types(raw: &str) -> Result<Vec<ResultType>, String> {
    let mut types = Vec::new();

    for label in raw.split([',', '|']).map(str::trim).filter(|l| !l.is_empty()) {
        let result_type =
            ResultType::from_label(label).ok_or_else(|| format!("unknown result type {label:?}"))?;
        if !types.contains(&result_type) {
            types.push(result_type);
        }
    }

    if types.is_empty() {
        return Err("no result types requested".to_string());
    }

    Ok(types)
}
