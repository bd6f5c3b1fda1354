//! Reference baseline and final answer value objects

use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Stage that produced the answer shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Summary,
    Refined,
    Synthesized,
    BaselineFallback,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Summary => "summary",
            AnswerSource::Refined => "refined",
            AnswerSource::Synthesized => "synthesized",
            AnswerSource::BaselineFallback => "baseline-fallback",
        }
    }
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub text: String,
    pub source: AnswerSource,
}

impl FinalAnswer {
    pub fn new(text: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == AnswerSource::BaselineFallback
    }
}

/// The one baseline the judge compares against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBaseline {
    pub agent: AgentId,
    pub text: String,
}

impl ReferenceBaseline {
    pub fn new(agent: AgentId, text: impl Into<String>) -> Self {
        Self {
            agent,
            text: text.into(),
        }
    }

    /// The reference used as a final answer after a rejected candidate
    pub fn as_fallback(&self) -> FinalAnswer {
        FinalAnswer::new(self.text.clone(), AnswerSource::BaselineFallback)
    }
}
