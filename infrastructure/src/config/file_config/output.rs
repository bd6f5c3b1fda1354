//! Output configuration from TOML (`[output]` section)

use debate_domain::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw output configuration from TOML
///
/// # Example
///
/// ```toml
/// [output]
/// format = "full"                          # "full", "answer" or "json"
/// color = true
/// transcript = "debates/last.json"         # sealed session snapshot
/// event_log = "debates/events.jsonl"       # every progress event
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
    pub transcript: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            transcript: None,
            event_log: None,
        }
    }
}
