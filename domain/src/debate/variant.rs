//! Protocol variants and the pipeline plan each one resolves to.
//!
//! A session picks its variant once. The orchestrator never branches on
//! the variant itself, only on the tags of the resolved [`PipelinePlan`].
//!
//! | Variant | Seed | Rounds | Consolidation | Judge reference |
//! |---------|------|--------|---------------|-----------------|
//! | `factor-centric` | factor lists from all agents | factor | merge + summary | summary of anchor factors |
//! | `prose-critique` | anchor prose, critiqued into factors | factor | merge + summary | anchor prose |
//! | `integrated-refinement` | as above | factor | merge + summary + refine | anchor prose |
//! | `parallel-baseline` | prose from all agents | free-form | synthesis | anchor prose |

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    FactorCentric,
    ProseCritique,
    #[default]
    IntegratedRefinement,
    ParallelBaseline,
}

impl ProtocolVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVariant::FactorCentric => "factor-centric",
            ProtocolVariant::ProseCritique => "prose-critique",
            ProtocolVariant::IntegratedRefinement => "integrated-refinement",
            ProtocolVariant::ParallelBaseline => "parallel-baseline",
        }
    }

    pub fn all() -> [ProtocolVariant; 4] {
        [
            ProtocolVariant::FactorCentric,
            ProtocolVariant::ProseCritique,
            ProtocolVariant::IntegratedRefinement,
            ProtocolVariant::ParallelBaseline,
        ]
    }

    pub fn plan(&self) -> PipelinePlan {
        match self {
            ProtocolVariant::FactorCentric => PipelinePlan {
                seed: SeedStage::FactorLists,
                rounds: RoundMode::Factor,
                consolidation: Consolidation::Merge { refine: false },
                reference: ReferenceSource::AnchorFactorSummary,
            },
            ProtocolVariant::ProseCritique => PipelinePlan {
                seed: SeedStage::AnchorProseCritique,
                rounds: RoundMode::Factor,
                consolidation: Consolidation::Merge { refine: false },
                reference: ReferenceSource::AnchorProse,
            },
            ProtocolVariant::IntegratedRefinement => PipelinePlan {
                seed: SeedStage::AnchorProseCritique,
                rounds: RoundMode::Factor,
                consolidation: Consolidation::Merge { refine: true },
                reference: ReferenceSource::AnchorProse,
            },
            ProtocolVariant::ParallelBaseline => PipelinePlan {
                seed: SeedStage::ParallelProse,
                rounds: RoundMode::FreeForm,
                consolidation: Consolidation::Synthesize,
                reference: ReferenceSource::AnchorProse,
            },
        }
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProtocolVariant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "factor-centric" | "factor" | "v1" => Ok(ProtocolVariant::FactorCentric),
            "prose-critique" | "critique" | "v2" => Ok(ProtocolVariant::ProseCritique),
            "integrated-refinement" | "refine" | "v3" => Ok(ProtocolVariant::IntegratedRefinement),
            "parallel-baseline" | "parallel" | "v4" => Ok(ProtocolVariant::ParallelBaseline),
            other => Err(DomainError::UnknownVariant(other.to_string())),
        }
    }
}

/// How round 0 is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStage {
    /// Every agent lists factors for the question
    FactorLists,
    /// The anchor writes prose; every agent critiques it into factors
    AnchorProseCritique,
    /// Every agent writes prose independently
    ParallelProse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    /// Factor-list rounds with convergence detection
    Factor,
    /// Prose critique rounds, fixed count
    FreeForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consolidation {
    Merge { refine: bool },
    Synthesize,
}

/// Where the judge's reference answer comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Prose summary of the anchor's seed factor list
    AnchorFactorSummary,
    /// The anchor's prose baseline
    AnchorProse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePlan {
    pub seed: SeedStage,
    pub rounds: RoundMode,
    pub consolidation: Consolidation,
    pub reference: ReferenceSource,
}

/// How the parallel-baseline variant produces its candidate answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesizerStrategy {
    /// Dedicated synthesis prompt over all baselines and critiques
    #[default]
    Dedicated,
    /// Refine the anchor baseline with the concatenated final critiques
    ReferenceRefine,
}

impl FromStr for SynthesizerStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dedicated" | "default" => Ok(Self::Dedicated),
            "reference-refine" | "refine" => Ok(Self::ReferenceRefine),
            other => Err(format!("unknown synthesizer strategy: {}", other)),
        }
    }
}
