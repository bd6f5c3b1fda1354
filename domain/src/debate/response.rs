//! Agent responses and debate rounds.

use super::factor::{Factor, factors_to_json};
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed content of one agent answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseContent {
    Factors { factors: Vec<Factor> },
    Prose { text: String },
}

/// One agent's answer at one stage of the debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: AgentId,
    /// Round index the response belongs to (0 = seed)
    pub round: usize,
    pub content: ResponseContent,
    /// Unparsed model output
    pub raw: String,
}

impl AgentResponse {
    pub fn factors(agent: AgentId, round: usize, factors: Vec<Factor>, raw: impl Into<String>) -> Self {
        Self {
            agent,
            round,
            content: ResponseContent::Factors { factors },
            raw: raw.into(),
        }
    }

    pub fn prose(agent: AgentId, round: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            agent,
            round,
            raw: text.clone(),
            content: ResponseContent::Prose { text },
        }
    }

    pub fn factor_list(&self) -> Option<&[Factor]> {
        match &self.content {
            ResponseContent::Factors { factors } => Some(factors),
            ResponseContent::Prose { .. } => None,
        }
    }

    pub fn prose_text(&self) -> Option<&str> {
        match &self.content {
            ResponseContent::Prose { text } => Some(text),
            ResponseContent::Factors { .. } => None,
        }
    }

    /// Text used when this response is shown to another agent
    pub fn render(&self) -> String {
        match &self.content {
            ResponseContent::Factors { factors } => factors_to_json(factors),
            ResponseContent::Prose { text } => text.clone(),
        }
    }

    /// Same response re-tagged for a later round (carried-over context)
    pub fn carried_to(&self, round: usize) -> Self {
        Self {
            round,
            ..self.clone()
        }
    }
}

/// A recorded debate round.
///
/// Responses are keyed by agent, so iteration order is independent of the
/// order in which agents answered. Agents whose call failed appear in
/// `failures` and not in `responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub index: usize,
    pub responses: BTreeMap<AgentId, AgentResponse>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<AgentId, String>,
    /// Human feedback that was part of this round's prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_feedback: Option<String>,
}

impl Round {
    pub fn new(
        index: usize,
        responses: BTreeMap<AgentId, AgentResponse>,
        failures: BTreeMap<AgentId, String>,
    ) -> Self {
        Self {
            index,
            responses,
            failures,
            human_feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Option<String>) -> Self {
        self.human_feedback = feedback.filter(|f| !f.trim().is_empty());
        self
    }

    /// True when no agent produced a usable response
    pub fn is_exhausted(&self) -> bool {
        self.responses.is_empty()
    }

    /// Factor lists of every agent that answered with factors
    pub fn factor_lists(&self) -> BTreeMap<AgentId, Vec<Factor>> {
        self.responses
            .iter()
            .filter_map(|(agent, r)| r.factor_list().map(|f| (agent.clone(), f.to_vec())))
            .collect()
    }

    /// Rendered text of every response, for progress events
    pub fn rendered(&self) -> BTreeMap<AgentId, String> {
        self.responses
            .iter()
            .map(|(agent, r)| (agent.clone(), r.render()))
            .collect()
    }
}
