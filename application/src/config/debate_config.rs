//! Debate configuration.
//!
//! [`DebateConfig`] is resolved once, before a session starts, and handed to
//! the orchestrator by value. Inner components receive only the slices they
//! need (thresholds, merge parameters, the moderator id) and never read
//! configuration from anywhere else.
//!
//! # Roles
//!
//! | Role | Default | Used for |
//! |------|---------|----------|
//! | participants | - | baselines, critiques, debate rounds |
//! | anchor | first participant | reference baseline |
//! | moderator | anchor | grouping, merge, summary, refine, synthesis, judge |

use debate_domain::{
    AgentId, ConfigIssue, ConfigIssueCode, ConvergenceThresholds, GroupingMode, MergeParams,
    ProtocolVariant, RatingThresholds, Severity, SynthesizerStrategy,
};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DebateConfig {
    variant: ProtocolVariant,
    participants: Vec<AgentId>,
    anchor: Option<AgentId>,
    moderator: Option<AgentId>,
    max_rounds: usize,
    freeform_rounds: usize,
    convergence: ConvergenceThresholds,
    grouping: GroupingMode,
    merge: MergeParams,
    judge: RatingThresholds,
    synthesizer: SynthesizerStrategy,
    feedback: bool,
    call_timeout: Duration,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            variant: ProtocolVariant::default(),
            participants: Vec::new(),
            anchor: None,
            moderator: None,
            max_rounds: 3,
            freeform_rounds: 1,
            convergence: ConvergenceThresholds::default(),
            grouping: GroupingMode::default(),
            merge: MergeParams::default(),
            judge: RatingThresholds::default(),
            synthesizer: SynthesizerStrategy::default(),
            feedback: false,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl DebateConfig {
    pub fn new(participants: Vec<AgentId>) -> Self {
        Self {
            participants,
            ..Default::default()
        }
    }

    // ==================== Accessors ====================

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn participants(&self) -> &[AgentId] {
        &self.participants
    }

    /// Agent whose baseline is the judge's reference
    pub fn anchor(&self) -> Option<&AgentId> {
        self.anchor.as_ref().or_else(|| self.participants.first())
    }

    /// Agent that runs every consolidation and judge call
    pub fn moderator(&self) -> Option<&AgentId> {
        self.moderator.as_ref().or_else(|| self.anchor())
    }

    /// Ceiling on structured critique rounds (round 0 excluded)
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Fixed number of free-form critique rounds
    pub fn freeform_rounds(&self) -> usize {
        self.freeform_rounds
    }

    pub fn convergence(&self) -> &ConvergenceThresholds {
        &self.convergence
    }

    pub fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    pub fn merge(&self) -> &MergeParams {
        &self.merge
    }

    pub fn judge(&self) -> &RatingThresholds {
        &self.judge
    }

    pub fn synthesizer(&self) -> SynthesizerStrategy {
        self.synthesizer
    }

    /// Whether the loop suspends for human feedback between rounds
    pub fn feedback_enabled(&self) -> bool {
        self.feedback
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    // ==================== Builder Methods ====================

    pub fn with_variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_anchor(mut self, anchor: AgentId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_moderator(mut self, moderator: AgentId) -> Self {
        self.moderator = Some(moderator);
        self
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_freeform_rounds(mut self, rounds: usize) -> Self {
        self.freeform_rounds = rounds;
        self
    }

    pub fn with_convergence(mut self, thresholds: ConvergenceThresholds) -> Self {
        self.convergence = thresholds;
        self
    }

    pub fn with_grouping(mut self, mode: GroupingMode) -> Self {
        self.grouping = mode;
        self
    }

    pub fn with_merge(mut self, params: MergeParams) -> Self {
        self.merge = params;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.merge.top_k = top_k;
        self
    }

    pub fn with_judge(mut self, thresholds: RatingThresholds) -> Self {
        self.judge = thresholds;
        self
    }

    pub fn with_synthesizer(mut self, strategy: SynthesizerStrategy) -> Self {
        self.synthesizer = strategy;
        self
    }

    pub fn with_feedback(mut self, enabled: bool) -> Self {
        self.feedback = enabled;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    // ==================== Validation ====================

    /// Report every problem with this configuration
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.participants.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NoAgents,
                "at least one participating agent is required",
            ));
        } else if self.participants.len() == 1 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::SingleAgent,
                "a single agent debates with itself; rounds add little value",
            ));
        }

        let mut seen = BTreeSet::new();
        for agent in &self.participants {
            if !seen.insert(agent) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateAgent,
                    format!("agent '{}' is listed more than once", agent),
                ));
            }
        }

        if let Some(anchor) = &self.anchor
            && !self.participants.contains(anchor)
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::AnchorNotParticipant,
                format!("anchor '{}' is not a participating agent", anchor),
            ));
        }

        if self.max_rounds == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroRounds,
                "max_rounds must be at least 1",
            ));
        }
        if self.variant == ProtocolVariant::ParallelBaseline && self.freeform_rounds == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroRounds,
                "freeform_rounds must be at least 1",
            ));
        }

        if self.merge.top_k == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTopK,
                "top_k must be at least 1",
            ));
        }

        let unit = 0.0..=1.0;
        let mut check_unit = |name: &str, value: f64| {
            if !unit.contains(&value) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ThresholdOutOfRange,
                    format!("{} must be within [0, 1], got {}", name, value),
                ));
            }
        };
        check_unit("convergence.max_confidence_delta", self.convergence.max_confidence_delta);
        check_unit("merge.min_confidence", self.merge.min_confidence);
        for (criterion, minimum) in self.judge.iter() {
            check_unit(&format!("judge.{}", criterion), minimum);
        }

        if self.judge.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::NoJudgeCriteria,
                "no judge criteria configured; every candidate answer is accepted",
            ));
        }

        if self.call_timeout.is_zero() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "call timeout must be greater than zero",
            ));
        }

        issues
    }

    /// Check whether any issues are errors (i.e. fatal).
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}
