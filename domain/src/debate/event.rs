//! Progress events emitted by a debate session.
//!
//! Events are plain data, serialized with an `event` tag so a JSONL log or
//! any other transport can forward them unchanged.

use super::answer::AnswerSource;
use super::judge::Decision;
use super::merge::MergedResult;
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline stage, used to label model calls and agent failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Baseline,
    Critique,
    Round,
    Grouping,
    Merge,
    Summary,
    Refine,
    Synthesis,
    Judge,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Baseline => "baseline",
            Stage::Critique => "critique",
            Stage::Round => "round",
            Stage::Grouping => "grouping",
            Stage::Merge => "merge",
            Stage::Summary => "summary",
            Stage::Refine => "refine",
            Stage::Synthesis => "synthesis",
            Stage::Judge => "judge",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DebateEvent {
    BaselineOutput {
        agent: AgentId,
        text: String,
    },
    CritiqueResults {
        responses: BTreeMap<AgentId, String>,
    },
    DebateRound {
        round_index: usize,
        responses: BTreeMap<AgentId, String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        failures: BTreeMap<AgentId, String>,
    },
    MergeResults {
        merged: MergedResult,
    },
    SummaryResults {
        text: String,
    },
    RefinedAnswer {
        text: String,
    },
    /// One event per agent
    ParallelBaselines {
        agent: AgentId,
        text: String,
    },
    FreeformCritique {
        agent: AgentId,
        round_index: usize,
        text: String,
    },
    SynthesizedAnswer {
        text: String,
    },
    JudgeResults {
        decision: Decision,
        ratings: BTreeMap<String, f64>,
        raw_rationale: String,
    },
    FinalAnswer {
        text: String,
        source: AnswerSource,
    },
    AgentFailed {
        stage: Stage,
        agent: AgentId,
        message: String,
    },
    FeedbackRequested {
        round_index: usize,
    },
    Converged {
        round_index: usize,
    },
    Error {
        message: String,
    },
    Complete,
}

impl DebateEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            DebateEvent::BaselineOutput { .. } => "baseline_output",
            DebateEvent::CritiqueResults { .. } => "critique_results",
            DebateEvent::DebateRound { .. } => "debate_round",
            DebateEvent::MergeResults { .. } => "merge_results",
            DebateEvent::SummaryResults { .. } => "summary_results",
            DebateEvent::RefinedAnswer { .. } => "refined_answer",
            DebateEvent::ParallelBaselines { .. } => "parallel_baselines",
            DebateEvent::FreeformCritique { .. } => "freeform_critique",
            DebateEvent::SynthesizedAnswer { .. } => "synthesized_answer",
            DebateEvent::JudgeResults { .. } => "judge_results",
            DebateEvent::FinalAnswer { .. } => "final_answer",
            DebateEvent::AgentFailed { .. } => "agent_failed",
            DebateEvent::FeedbackRequested { .. } => "feedback_requested",
            DebateEvent::Converged { .. } => "converged",
            DebateEvent::Error { .. } => "error",
            DebateEvent::Complete => "complete",
        }
    }

    /// Error and Complete end the event stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, DebateEvent::Error { .. } | DebateEvent::Complete)
    }
}
