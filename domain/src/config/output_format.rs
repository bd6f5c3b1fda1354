//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished debate is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every stage: baselines, rounds, merge, verdict and answer
    Full,
    /// Only the final answer (default)
    #[default]
    Answer,
    /// The sealed session as JSON
    Json,
}
