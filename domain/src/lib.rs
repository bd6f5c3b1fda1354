//! Domain layer for llm-debate
//!
//! This crate contains the debate entities, the parsing of model output
//! and the decision rules. It has no I/O and no async code.
//!
//! # Core Concepts
//!
//! ## Debate
//!
//! Several agents answer one question, critique each other over a bounded
//! number of rounds, and their output is consolidated into one candidate
//! answer:
//!
//! - **Factor**: a named claim with justification and confidence
//! - **Round**: every agent's response at one step, keyed by agent
//! - **Merge**: ranked consensus of all agents' factors
//! - **Judge**: compares the candidate with the reference baseline and
//!   falls back to the baseline on rejection
//!
//! ## Protocol Variants
//!
//! [`ProtocolVariant`] resolves to a [`PipelinePlan`] describing the seed
//! stage, the round mode and the consolidation step.

pub mod config;
pub mod core;
pub mod debate;
pub mod prompt;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{agent::AgentId, error::DomainError, question::Question};
pub use debate::{
    answer::{AnswerSource, FinalAnswer, ReferenceBaseline},
    convergence::{ConvergenceMeasure, ConvergenceThresholds, FactorGrouping, GroupingMode},
    event::{DebateEvent, Stage},
    factor::{Factor, parse_factor_list},
    judge::{Decision, JudgeVerdict, RatingThresholds},
    merge::{FactorSource, MergeMethod, MergeParams, MergedFactor, MergedResult, algorithmic_merge},
    response::{AgentResponse, ResponseContent, Round},
    session::{DebateSession, SessionOutcome},
    variant::{
        Consolidation, PipelinePlan, ProtocolVariant, ReferenceSource, RoundMode, SeedStage,
        SynthesizerStrategy,
    },
};
pub use prompt::PromptTemplate;
