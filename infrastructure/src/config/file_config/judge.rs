//! Judge criteria from TOML (`[judge]` section)

use debate_domain::RatingThresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw judge configuration from TOML
///
/// # Example
///
/// ```toml
/// [judge.criteria]
/// accuracy = 0.6
/// completeness = 0.6
/// ```
///
/// When `criteria` is absent the defaults apply (completeness, correctness
/// and clarity at 0.5). A present table replaces them entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileJudgeConfig {
    pub criteria: Option<BTreeMap<String, f64>>,
}

impl FileJudgeConfig {
    pub fn thresholds(&self) -> RatingThresholds {
        match &self.criteria {
            None => RatingThresholds::default(),
            Some(criteria) => criteria
                .iter()
                .fold(RatingThresholds::empty(), |t, (name, min)| t.with_criterion(name, *min)),
        }
    }
}
