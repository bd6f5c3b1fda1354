//! Consensus merge of many agents' factor lists.
//!
//! The preferred merge is a moderator call that groups semantically
//! equivalent factors and ranks them; [`parse_merged_factors`] turns its
//! JSON answer into a [`MergedResult`]. When that call fails or returns
//! nothing usable, [`algorithmic_merge`] produces a deterministic result
//! from normalized-name groups.

use super::factor::{Factor, extract_json_array, normalize_name, number_field};
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Which path produced a merged result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Llm,
    Algorithmic,
}

/// One original factor that contributed to a merged factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorSource {
    pub agent: AgentId,
    pub factor_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFactor {
    pub factor: Factor,
    /// Number of distinct agents endorsing the factor
    pub endorsement_count: usize,
    pub sources: Vec<FactorSource>,
}

/// Ranked consensus factors, at most `top_k` of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    pub factors: Vec<MergedFactor>,
    pub method: MergeMethod,
}

impl MergedResult {
    /// Build a result, keeping the first `top_k` ranked entries
    pub fn ranked(mut factors: Vec<MergedFactor>, method: MergeMethod, top_k: usize) -> Self {
        factors.truncate(top_k);
        Self { factors, method }
    }

    /// Treat a single agent's list as an already-ranked result
    pub fn from_single_agent(agent: &AgentId, factors: &[Factor]) -> Self {
        let factors = factors
            .iter()
            .map(|f| MergedFactor {
                factor: f.clone(),
                endorsement_count: 1,
                sources: vec![FactorSource {
                    agent: agent.clone(),
                    factor_name: f.name.clone(),
                }],
            })
            .collect();
        Self {
            factors,
            method: MergeMethod::Algorithmic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.factors.iter().map(|m| m.factor.name.as_str()).collect()
    }
}

/// Parameters for the merge and its fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    pub top_k: usize,
    /// Fallback keeps groups endorsed by at least this many agents...
    pub min_endorsements: usize,
    /// ...or whose mean confidence reaches this value
    pub min_confidence: f64,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_endorsements: 2,
            min_confidence: 0.8,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeParseError {
    #[error("no JSON array in merge response")]
    NoArray,

    #[error("merge response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("merge response contained no usable factors")]
    Empty,
}

/// Deterministic merge: exact normalized-name groups, endorsement count, mean confidence.
///
/// Each agent endorses a group at most once, with its highest confidence
/// for that group. Groups are kept when endorsed by at least
/// `min_endorsements` agents (capped at the number of contributing agents,
/// so a lone agent is not filtered to nothing) or when their mean
/// confidence reaches `min_confidence`. Ranking is by endorsement count,
/// then mean confidence, then name.
pub fn algorithmic_merge(inputs: &BTreeMap<AgentId, Vec<Factor>>, params: &MergeParams) -> MergedResult {
    struct Group {
        name: String,
        per_agent: BTreeMap<AgentId, (f64, String, String)>,
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (agent, factors) in inputs {
        for factor in factors {
            let key = factor.normalized_name();
            if key.is_empty() {
                continue;
            }
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    name: factor.name.clone(),
                    per_agent: BTreeMap::new(),
                });
                groups.len() - 1
            });
            let entry = groups[slot].per_agent.entry(agent.clone()).or_insert((
                factor.confidence,
                factor.justification.clone(),
                factor.name.clone(),
            ));
            if factor.confidence > entry.0 {
                entry.0 = factor.confidence;
            }
        }
    }

    let contributing = inputs.values().filter(|f| !f.is_empty()).count();
    let min_endorsements = params.min_endorsements.min(contributing.max(1));

    let mut merged: Vec<MergedFactor> = groups
        .into_iter()
        .filter_map(|group| {
            let endorsement_count = group.per_agent.len();
            let mean = group.per_agent.values().map(|(c, _, _)| c).sum::<f64>() / endorsement_count as f64;
            if endorsement_count < min_endorsements && mean < params.min_confidence {
                return None;
            }
            let justification = group
                .per_agent
                .iter()
                .filter(|(_, (_, j, _))| !j.is_empty())
                .map(|(agent, (_, j, _))| format!("({}): {}", agent, j))
                .collect::<Vec<_>>()
                .join("\n");
            let sources = group
                .per_agent
                .iter()
                .map(|(agent, (_, _, name))| FactorSource {
                    agent: agent.clone(),
                    factor_name: name.clone(),
                })
                .collect();
            Some(MergedFactor {
                factor: Factor::new(group.name, justification, mean),
                endorsement_count,
                sources,
            })
        })
        .collect();

    merged.sort_by(|a, b| {
        b.endorsement_count
            .cmp(&a.endorsement_count)
            .then(b.factor.confidence.total_cmp(&a.factor.confidence))
            .then_with(|| a.factor.normalized_name().cmp(&b.factor.normalized_name()))
    });

    MergedResult::ranked(merged, MergeMethod::Algorithmic, params.top_k)
}

/// Parse the moderator's merge answer.
///
/// Accepts a JSON array of objects with `name` (or `factor_name`),
/// `justification`, `confidence` and optional `endorsement_count` and
/// `sources` (`[{"agent": .., "factor_name": ..}]`). Entries are kept in
/// the order given; later entries whose normalized name repeats an earlier
/// one are dropped. Sources naming unknown agents are ignored. When the
/// model omits provenance, sources are recovered from input factors with
/// the same normalized name.
pub fn parse_merged_factors(
    text: &str,
    inputs: &BTreeMap<AgentId, Vec<Factor>>,
    top_k: usize,
) -> Result<MergedResult, MergeParseError> {
    let json = extract_json_array(text).ok_or(MergeParseError::NoArray)?;
    let items: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| MergeParseError::InvalidJson(e.to_string()))?;

    let mut seen = BTreeSet::new();
    let mut merged = Vec::new();

    for item in &items {
        let Some(name) = item
            .get("name")
            .or_else(|| item.get("factor_name"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
        else {
            continue;
        };
        if !seen.insert(normalize_name(name)) {
            continue;
        }
        let justification = item
            .get("justification")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let Some(confidence) = item.get("confidence").and_then(number_field) else {
            continue;
        };

        let mut sources = parse_sources(item, inputs);
        if sources.is_empty() {
            sources = literal_sources(name, inputs);
        }
        let distinct_agents = sources.iter().map(|s| &s.agent).collect::<BTreeSet<_>>().len();
        let endorsement_count = item
            .get("endorsement_count")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(distinct_agents)
            .clamp(1, inputs.len().max(1));

        merged.push(MergedFactor {
            factor: Factor::new(name, justification, confidence),
            endorsement_count,
            sources,
        });
    }

    if merged.is_empty() {
        return Err(MergeParseError::Empty);
    }

    Ok(MergedResult::ranked(merged, MergeMethod::Llm, top_k))
}

fn parse_sources(item: &serde_json::Value, inputs: &BTreeMap<AgentId, Vec<Factor>>) -> Vec<FactorSource> {
    let Some(list) = item.get("sources").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|s| {
            let agent = AgentId::new(s.get("agent")?.as_str()?);
            let factor_name = s
                .get("factor_name")
                .or_else(|| s.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            inputs
                .contains_key(&agent)
                .then_some(FactorSource { agent, factor_name })
        })
        .collect()
}

fn literal_sources(name: &str, inputs: &BTreeMap<AgentId, Vec<Factor>>) -> Vec<FactorSource> {
    let key = normalize_name(name);
    inputs
        .iter()
        .flat_map(|(agent, factors)| {
            factors
                .iter()
                .filter(|f| f.normalized_name() == key)
                .map(|f| FactorSource {
                    agent: agent.clone(),
                    factor_name: f.name.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(lists: &[(&str, &[(&str, f64)])]) -> BTreeMap<AgentId, Vec<Factor>> {
        lists
            .iter()
            .map(|(agent, factors)| {
                (
                    AgentId::new(*agent),
                    factors
                        .iter()
                        .map(|(n, c)| Factor::new(*n, format!("{} matters", n), *c))
                        .collect(),
                )
            })
            .collect()
    }

    fn three_agent_scenario() -> BTreeMap<AgentId, Vec<Factor>> {
        inputs(&[
            ("agent-1", &[("A", 0.9), ("B", 0.7), ("C", 0.5)]),
            ("agent-2", &[("A", 0.8), ("B", 0.6), ("D", 0.4)]),
            ("agent-3", &[("A", 0.85), ("C", 0.55), ("D", 0.45)]),
        ])
    }

    #[test]
    fn test_three_agent_scenario_top_two() {
        let params = MergeParams {
            top_k: 2,
            ..Default::default()
        };
        let result = algorithmic_merge(&three_agent_scenario(), &params);

        assert_eq!(result.method, MergeMethod::Algorithmic);
        assert_eq!(result.names(), vec!["A", "B"]);
        assert_eq!(result.factors[0].endorsement_count, 3);
        assert!((result.factors[0].factor.confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.factors[1].endorsement_count, 2);
        assert_eq!(result.factors[0].sources.len(), 3);
    }

    #[test]
    fn test_output_bounded_by_top_k_and_groups() {
        let data = three_agent_scenario();
        for top_k in 0..6 {
            let params = MergeParams {
                top_k,
                ..Default::default()
            };
            let result = algorithmic_merge(&data, &params);
            assert!(result.len() <= top_k);
            assert!(result.len() <= 4);
        }
    }

    #[test]
    fn test_agent_endorses_group_once() {
        let data = inputs(&[("a", &[("X", 0.4), ("x ", 0.9)]), ("b", &[("Y", 0.9)])]);
        let result = algorithmic_merge(&data, &MergeParams::default());
        let x = result.factors.iter().find(|m| m.factor.name == "X").unwrap();
        assert_eq!(x.endorsement_count, 1);
        assert_eq!(x.factor.confidence, 0.9);
    }

    #[test]
    fn test_filter_drops_weak_single_endorsements() {
        let data = inputs(&[("a", &[("X", 0.9), ("Weak", 0.3)]), ("b", &[("X", 0.6)])]);
        let result = algorithmic_merge(&data, &MergeParams::default());
        assert_eq!(result.names(), vec!["X"]);
    }

    #[test]
    fn test_single_agent_is_not_filtered_to_nothing() {
        let data = inputs(&[("solo", &[("X", 0.3), ("Y", 0.2)])]);
        let result = algorithmic_merge(&data, &MergeParams::default());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_parse_llm_merge_with_sources() {
        let data = three_agent_scenario();
        let text = r#"```json
[
  {"name": "A", "justification": "all agree", "confidence": 0.9, "endorsement_count": 3,
   "sources": [{"agent": "agent-1", "factor_name": "A"}, {"agent": "ghost", "factor_name": "A"}]},
  {"factor_name": "B or C", "justification": "close call", "confidence": 0.6},
  {"name": "a", "justification": "duplicate", "confidence": 0.1}
]
```"#;
        let result = parse_merged_factors(text, &data, 5).unwrap();
        assert_eq!(result.method, MergeMethod::Llm);
        assert_eq!(result.names(), vec!["A", "B or C"]);
        assert_eq!(result.factors[0].endorsement_count, 3);
        assert_eq!(result.factors[0].sources.len(), 1);
        assert_eq!(result.factors[1].endorsement_count, 1);
    }

    #[test]
    fn test_parse_recovers_literal_sources() {
        let data = three_agent_scenario();
        let text = r#"[{"name": "D", "justification": "j", "confidence": 0.5}]"#;
        let result = parse_merged_factors(text, &data, 5).unwrap();
        assert_eq!(result.factors[0].sources.len(), 2);
        assert_eq!(result.factors[0].endorsement_count, 2);
    }

    #[test]
    fn test_parse_truncates_to_top_k() {
        let data = three_agent_scenario();
        let text = r#"[{"name": "A", "justification": "", "confidence": 0.9},
                       {"name": "B", "justification": "", "confidence": 0.8},
                       {"name": "C", "justification": "", "confidence": 0.7}]"#;
        assert_eq!(parse_merged_factors(text, &data, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_failures() {
        let data = three_agent_scenario();
        assert_eq!(
            parse_merged_factors("nothing", &data, 3),
            Err(MergeParseError::NoArray)
        );
        assert!(matches!(
            parse_merged_factors("[oops]", &data, 3),
            Err(MergeParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_merged_factors(r#"[{"justification": "no name"}]"#, &data, 3),
            Err(MergeParseError::Empty)
        );
    }
}
