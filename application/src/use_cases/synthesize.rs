//! Candidate answer for the parallel-baseline variant.

use super::fan_out::invoke_with_timeout;
use super::refine::{Refiner, non_blank};
use crate::ports::model_adapter::{AdapterError, ModelAdapter, ModelRequest};
use debate_domain::{
    AgentId, PromptTemplate, ReferenceBaseline, Round, Stage, SynthesizerStrategy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Combines independent prose baselines and the critiques exchanged
/// between them into one answer.
///
/// [`SynthesizerStrategy::Dedicated`] asks the moderator with a synthesis
/// prompt over every baseline and every critique round.
/// [`SynthesizerStrategy::ReferenceRefine`] instead refines the reference
/// baseline with each agent's latest critique as insights.
pub struct Synthesizer<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    moderator: AgentId,
    strategy: SynthesizerStrategy,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> Synthesizer<A> {
    pub fn new(adapter: Arc<A>, moderator: AgentId, strategy: SynthesizerStrategy, timeout: Duration) -> Self {
        Self {
            adapter,
            moderator,
            strategy,
            timeout,
        }
    }

    /// `critiques` are the free-form rounds after the seed, oldest first
    pub async fn synthesize(
        &self,
        question: &str,
        reference: &ReferenceBaseline,
        baselines: &BTreeMap<AgentId, String>,
        critiques: &[Round],
    ) -> Result<String, AdapterError> {
        info!("Synthesizing with strategy {:?}", self.strategy);
        match self.strategy {
            SynthesizerStrategy::Dedicated => {
                let baselines: Vec<(String, String)> = baselines
                    .iter()
                    .map(|(agent, text)| (agent.to_string(), text.clone()))
                    .collect();
                let critiques: Vec<(String, String)> = critiques
                    .iter()
                    .flat_map(|round| {
                        round.responses.iter().map(move |(agent, response)| {
                            (format!("{}, round {}", agent, round.index), response.render())
                        })
                    })
                    .collect();
                let request = ModelRequest::prose(
                    Stage::Synthesis,
                    PromptTemplate::moderator_system(),
                    PromptTemplate::synthesis(question, &baselines, &critiques),
                    self.timeout,
                );
                non_blank(invoke_with_timeout(self.adapter.as_ref(), &self.moderator, &request).await)
            }
            SynthesizerStrategy::ReferenceRefine => {
                let insights = latest_critiques(critiques)
                    .iter()
                    .map(|(agent, text)| format!("({}): {}", agent, text))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                Refiner::new(Arc::clone(&self.adapter), self.moderator.clone(), self.timeout)
                    .refine(question, &reference.text, &insights)
                    .await
            }
        }
    }
}

/// Each agent's most recent successful critique; failed rounds keep the earlier one
fn latest_critiques(critiques: &[Round]) -> BTreeMap<&AgentId, String> {
    let mut latest = BTreeMap::new();
    for round in critiques {
        for (agent, response) in &round.responses {
            latest.insert(agent, response.render());
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_domain::AgentResponse;
    use crate::testing::ScriptedAdapter;

    fn critique_round(index: usize, texts: &[(&str, &str)]) -> Round {
        let responses = texts
            .iter()
            .map(|(a, t)| {
                let agent = AgentId::new(*a);
                (agent.clone(), AgentResponse::prose(agent, index, *t))
            })
            .collect();
        Round::new(index, responses, BTreeMap::new())
    }

    fn baselines() -> BTreeMap<AgentId, String> {
        [("a", "baseline A"), ("b", "baseline B")]
            .iter()
            .map(|(a, t)| (AgentId::new(*a), t.to_string()))
            .collect()
    }

    fn synthesizer(adapter: &Arc<ScriptedAdapter>, strategy: SynthesizerStrategy) -> Synthesizer<ScriptedAdapter> {
        Synthesizer::new(Arc::clone(adapter), AgentId::new("a"), strategy, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_dedicated_uses_all_baselines_and_critiques() {
        let adapter = Arc::new(ScriptedAdapter::new(|_, _| Ok("combined".to_string())));
        let reference = ReferenceBaseline::new(AgentId::new("a"), "baseline A");
        let rounds = vec![
            critique_round(1, &[("a", "first critique")]),
            critique_round(2, &[("b", "second critique")]),
        ];

        let text = synthesizer(&adapter, SynthesizerStrategy::Dedicated)
            .synthesize("Q", &reference, &baselines(), &rounds)
            .await
            .unwrap();

        assert_eq!(text, "combined");
        let prompt = &adapter.prompts(Stage::Synthesis)[0];
        assert!(prompt.contains("baseline B"));
        assert!(prompt.contains("--- a, round 1 ---"));
        assert!(prompt.contains("second critique"));
    }

    #[tokio::test]
    async fn test_reference_refine_keeps_latest_critique_per_agent() {
        let adapter = Arc::new(ScriptedAdapter::new(|_, _| Ok("refined".to_string())));
        let reference = ReferenceBaseline::new(AgentId::new("a"), "baseline A");
        let exhausted = Round::new(
            3,
            BTreeMap::new(),
            BTreeMap::from([
                (AgentId::new("a"), "timeout".to_string()),
                (AgentId::new("b"), "timeout".to_string()),
            ]),
        );
        let rounds = vec![
            critique_round(1, &[("a", "early a"), ("b", "early b")]),
            critique_round(2, &[("a", "late a")]),
            exhausted,
        ];

        synthesizer(&adapter, SynthesizerStrategy::ReferenceRefine)
            .synthesize("Q", &reference, &baselines(), &rounds)
            .await
            .unwrap();

        assert_eq!(adapter.count(Stage::Synthesis), 0);
        let prompt = &adapter.prompts(Stage::Refine)[0];
        assert!(prompt.contains("baseline A"));
        assert!(prompt.contains("(a): late a\n\n(b): early b"));
        assert!(!prompt.contains("early a"));
    }
}
