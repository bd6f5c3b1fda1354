//! Raw TOML configuration data types
//!
//! These structs mirror the config file layout. Enum-like settings are kept
//! as strings and parsed with `parse_*` methods that report a
//! [`ConfigIssue`] instead of failing deserialization.

mod agents;
mod debate;
mod judge;
mod output;

pub use agents::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, FileAgentsConfig, FileParticipantConfig};
pub use debate::{FileConvergenceConfig, FileDebateConfig, FileMergeConfig};
pub use judge::FileJudgeConfig;
pub use output::FileOutputConfig;

use debate_application::DebateConfig;
use debate_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal problems found while turning a [`FileConfig`] into a [`DebateConfig`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("invalid configuration:\n{}", list(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn list(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Protocol and thresholds
    pub debate: FileDebateConfig,
    /// Participants and their endpoints
    pub agents: FileAgentsConfig,
    /// Acceptance criteria
    pub judge: FileJudgeConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the file-level settings, returning all detected issues.
    ///
    /// Covers what only the file can get wrong: unknown enum values, blank
    /// names and a moderator without an endpoint. Semantic checks (round
    /// counts, thresholds, anchor membership) run on the resolved
    /// [`DebateConfig`].
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.debate.parse_variant().1);
        issues.extend(self.debate.parse_synthesizer().1);
        issues.extend(self.debate.parse_grouping().1);

        issues.extend(self.agents.parse_participants().1);
        issues.extend(self.agents.parse_anchor().1);
        issues.extend(self.agents.parse_moderator().1);
        issues.extend(self.agents.check_moderator_endpoint());

        issues
    }

    /// Resolve into the application's [`DebateConfig`].
    ///
    /// Fails if any error is found, either in the file or in the resolved
    /// configuration. Warnings are left to the caller.
    pub fn to_debate_config(&self) -> Result<DebateConfig, ConfigValidationError> {
        let mut issues = self.validate();

        let (participants, _) = self.agents.parse_participants();
        let mut config = DebateConfig::new(participants)
            .with_variant(self.debate.parse_variant().0)
            .with_max_rounds(self.debate.max_rounds)
            .with_freeform_rounds(self.debate.freeform_rounds)
            .with_convergence(self.debate.convergence_thresholds())
            .with_grouping(self.debate.parse_grouping().0)
            .with_merge(self.debate.merge_params())
            .with_judge(self.judge.thresholds())
            .with_synthesizer(self.debate.parse_synthesizer().0)
            .with_feedback(self.debate.feedback)
            .with_call_timeout(self.debate.timeout());
        if let Some(anchor) = self.agents.parse_anchor().0 {
            config = config.with_anchor(anchor);
        }
        if let Some(moderator) = self.agents.parse_moderator().0 {
            config = config.with_moderator(moderator);
        }

        issues.extend(config.validate());
        let errors: Vec<ConfigIssue> = issues.into_iter().filter(|i| i.is_error()).collect();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigValidationError::Invalid(errors))
        }
    }
}
