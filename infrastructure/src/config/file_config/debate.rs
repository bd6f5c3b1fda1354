//! Debate settings from TOML (`[debate]` section)

use debate_domain::{
    ConfigIssue, ConfigIssueCode, ConvergenceThresholds, GroupingMode, MergeParams,
    ProtocolVariant, SynthesizerStrategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw debate configuration from TOML
///
/// # Example
///
/// ```toml
/// [debate]
/// variant = "integrated-refinement"        # factor-centric, prose-critique,
///                                          # integrated-refinement, parallel-baseline
/// max_rounds = 3
/// freeform_rounds = 1                      # parallel-baseline only
/// top_k = 5
/// synthesizer = "dedicated"                # or "reference-refine"
/// feedback = false
/// timeout_seconds = 120
///
/// [debate.convergence]
/// grouping = "semantic"                    # or "literal"
/// max_set_changes = 0
/// max_confidence_delta = 0.1
///
/// [debate.merge]
/// min_endorsements = 2
/// min_confidence = 0.8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDebateConfig {
    pub variant: String,
    pub max_rounds: usize,
    pub freeform_rounds: usize,
    pub top_k: usize,
    pub synthesizer: String,
    /// Ask for human feedback between rounds
    pub feedback: bool,
    /// Per model call
    pub timeout_seconds: u64,
    pub convergence: FileConvergenceConfig,
    pub merge: FileMergeConfig,
}

impl Default for FileDebateConfig {
    fn default() -> Self {
        Self {
            variant: "integrated-refinement".to_string(),
            max_rounds: 3,
            freeform_rounds: 1,
            top_k: 5,
            synthesizer: "dedicated".to_string(),
            feedback: false,
            timeout_seconds: 120,
            convergence: FileConvergenceConfig::default(),
            merge: FileMergeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConvergenceConfig {
    pub grouping: String,
    pub max_set_changes: usize,
    pub max_confidence_delta: f64,
}

impl Default for FileConvergenceConfig {
    fn default() -> Self {
        let thresholds = ConvergenceThresholds::default();
        Self {
            grouping: "semantic".to_string(),
            max_set_changes: thresholds.max_set_changes,
            max_confidence_delta: thresholds.max_confidence_delta,
        }
    }
}

/// Fallback merge filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMergeConfig {
    pub min_endorsements: usize,
    pub min_confidence: f64,
}

impl Default for FileMergeConfig {
    fn default() -> Self {
        let params = MergeParams::default();
        Self {
            min_endorsements: params.min_endorsements,
            min_confidence: params.min_confidence,
        }
    }
}

fn invalid_value(field: &str, value: &str, valid: &[&str]) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::InvalidEnumValue,
        format!(
            "{}: unknown value '{}' (expected one of: {})",
            field,
            value,
            valid.join(", ")
        ),
    )
}

impl FileDebateConfig {
    /// Parse the variant name. Unknown names are errors.
    pub fn parse_variant(&self) -> (ProtocolVariant, Vec<ConfigIssue>) {
        match self.variant.parse::<ProtocolVariant>() {
            Ok(variant) => (variant, vec![]),
            Err(_) => {
                let valid: Vec<&str> = ProtocolVariant::all().iter().map(|v| v.as_str()).collect();
                let issue = invalid_value("debate.variant", &self.variant, &valid);
                (ProtocolVariant::default(), vec![issue])
            }
        }
    }

    pub fn parse_synthesizer(&self) -> (SynthesizerStrategy, Vec<ConfigIssue>) {
        match self.synthesizer.parse::<SynthesizerStrategy>() {
            Ok(strategy) => (strategy, vec![]),
            Err(_) => {
                let issue = invalid_value(
                    "debate.synthesizer",
                    &self.synthesizer,
                    &["dedicated", "reference-refine"],
                );
                (SynthesizerStrategy::default(), vec![issue])
            }
        }
    }

    pub fn parse_grouping(&self) -> (GroupingMode, Vec<ConfigIssue>) {
        match self.convergence.grouping.parse::<GroupingMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => {
                let issue = invalid_value(
                    "debate.convergence.grouping",
                    &self.convergence.grouping,
                    &["semantic", "literal"],
                );
                (GroupingMode::default(), vec![issue])
            }
        }
    }

    pub fn convergence_thresholds(&self) -> ConvergenceThresholds {
        ConvergenceThresholds {
            max_set_changes: self.convergence.max_set_changes,
            max_confidence_delta: self.convergence.max_confidence_delta,
        }
    }

    pub fn merge_params(&self) -> MergeParams {
        MergeParams {
            top_k: self.top_k,
            min_endorsements: self.merge.min_endorsements,
            min_confidence: self.merge.min_confidence,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
