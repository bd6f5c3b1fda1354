//! Convergence measurement between two structured rounds.
//!
//! Two rounds are compared per agent. Factor names are first mapped to
//! group labels through a [`FactorGrouping`], so that "Interest rates" and
//! "Monetary policy rate" count as the same factor when the moderator has
//! grouped them together. Then, for every agent present in both rounds:
//!
//! - `set_changes` accumulates the size of the symmetric difference between
//!   the agent's group sets
//! - confidence deltas are collected for every group the agent kept
//!
//! A round pair converges when every agent answered both rounds and both
//! numbers are within the configured thresholds.

use super::factor::{extract_json_object, normalize_name};
use super::response::Round;
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How factor names are matched across rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    /// Moderator call groups equivalent names (default)
    #[default]
    Semantic,
    /// Normalized-name equality only. Misses paraphrases.
    Literal,
}

impl std::str::FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "literal" => Ok(Self::Literal),
            other => Err(format!("unknown grouping mode: {}", other)),
        }
    }
}

/// Thresholds a round pair must stay within to count as converged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceThresholds {
    /// Maximum total symmetric difference across agents (inclusive)
    pub max_set_changes: usize,
    /// Maximum mean absolute confidence change (inclusive)
    pub max_confidence_delta: f64,
}

impl Default for ConvergenceThresholds {
    fn default() -> Self {
        Self {
            max_set_changes: 0,
            max_confidence_delta: 0.1,
        }
    }
}

/// Mapping from factor names to group labels.
///
/// Names without an explicit label fall back to their normalized form,
/// which makes an empty grouping behave like literal matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorGrouping {
    labels: HashMap<String, String>,
}

impl FactorGrouping {
    /// Grouping that matches normalized names only
    pub fn literal() -> Self {
        Self::default()
    }

    pub fn from_labels<I, N, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: AsRef<str>,
        L: AsRef<str>,
    {
        let labels = pairs
            .into_iter()
            .filter(|(_, label)| !label.as_ref().trim().is_empty())
            .map(|(name, label)| (normalize_name(name.as_ref()), normalize_name(label.as_ref())))
            .collect();
        Self { labels }
    }

    /// Parse a moderator grouping response: a JSON object `{"name": "label"}`.
    ///
    /// Returns `None` if no object is found or it maps nothing.
    pub fn parse(text: &str) -> Option<Self> {
        let json = extract_json_object(text)?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json).ok()?;
        let grouping = Self::from_labels(
            map.iter()
                .filter_map(|(name, label)| label.as_str().map(|l| (name.as_str(), l))),
        );
        (!grouping.is_empty()).then_some(grouping)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Group label of a factor name
    pub fn label_for(&self, name: &str) -> String {
        let normalized = normalize_name(name);
        self.labels.get(&normalized).cloned().unwrap_or(normalized)
    }
}

/// Result of comparing two structured rounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMeasure {
    pub set_changes: usize,
    pub mean_confidence_delta: f64,
    /// Agents that answered exactly one of the two rounds
    pub missing_agents: Vec<AgentId>,
    /// Agents compared in both rounds
    pub compared_agents: usize,
}

impl ConvergenceMeasure {
    pub fn compute(previous: &Round, current: &Round, grouping: &FactorGrouping) -> Self {
        let prev = grouped_confidences(previous, grouping);
        let curr = grouped_confidences(current, grouping);

        let agents: BTreeSet<&AgentId> = prev.keys().chain(curr.keys()).collect();
        let mut missing_agents = Vec::new();
        let mut set_changes = 0;
        let mut deltas = Vec::new();
        let mut compared_agents = 0;

        for agent in agents {
            let (Some(before), Some(after)) = (prev.get(agent), curr.get(agent)) else {
                missing_agents.push(agent.clone());
                continue;
            };
            compared_agents += 1;

            set_changes += before.keys().filter(|g| !after.contains_key(*g)).count();
            set_changes += after.keys().filter(|g| !before.contains_key(*g)).count();

            for (group, confidence) in before {
                if let Some(next) = after.get(group) {
                    deltas.push((next - confidence).abs());
                }
            }
        }

        let mean_confidence_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().sum::<f64>() / deltas.len() as f64
        };

        Self {
            set_changes,
            mean_confidence_delta,
            missing_agents,
            compared_agents,
        }
    }

    pub fn is_converged(&self, thresholds: &ConvergenceThresholds) -> bool {
        self.compared_agents > 0
            && self.missing_agents.is_empty()
            && self.set_changes <= thresholds.max_set_changes
            && self.mean_confidence_delta <= thresholds.max_confidence_delta
    }
}

/// Per agent: group label -> highest confidence among that agent's factors in the group
fn grouped_confidences(
    round: &Round,
    grouping: &FactorGrouping,
) -> BTreeMap<AgentId, BTreeMap<String, f64>> {
    round
        .factor_lists()
        .into_iter()
        .map(|(agent, factors)| {
            let mut groups: BTreeMap<String, f64> = BTreeMap::new();
            for factor in &factors {
                let entry = groups.entry(grouping.label_for(&factor.name)).or_insert(0.0);
                *entry = entry.max(factor.confidence);
            }
            (agent, groups)
        })
        .collect()
}

/// Every distinct factor name in a set of rounds, in first-seen order
pub fn distinct_factor_names<'a>(rounds: impl IntoIterator<Item = &'a Round>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for round in rounds {
        for factors in round.factor_lists().values() {
            for factor in factors {
                if seen.insert(factor.name.clone()) {
                    names.push(factor.name.clone());
                }
            }
        }
    }
    names
}
