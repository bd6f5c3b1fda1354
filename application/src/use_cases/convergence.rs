//! Convergence evaluation for structured rounds.

use super::fan_out::invoke_with_timeout;
use crate::ports::model_adapter::{ModelAdapter, ModelRequest};
use debate_domain::debate::convergence::distinct_factor_names;
use debate_domain::{
    AgentId, ConvergenceMeasure, ConvergenceThresholds, FactorGrouping, GroupingMode, PromptTemplate,
    Round, Stage,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceCheck {
    pub measure: ConvergenceMeasure,
    pub converged: bool,
    /// Whether the comparison used moderator grouping
    pub semantic: bool,
}

/// Decides whether two adjacent structured rounds have stabilized.
///
/// In semantic mode the moderator groups all factor names of both rounds
/// in one call; if that call fails or its answer cannot be parsed, the
/// evaluator falls back to normalized-name grouping for this comparison.
pub struct ConvergenceEvaluator<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    moderator: AgentId,
    mode: GroupingMode,
    thresholds: ConvergenceThresholds,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> ConvergenceEvaluator<A> {
    pub fn new(
        adapter: Arc<A>,
        moderator: AgentId,
        mode: GroupingMode,
        thresholds: ConvergenceThresholds,
        timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            moderator,
            mode,
            thresholds,
            timeout,
        }
    }

    pub async fn evaluate(&self, previous: &Round, current: &Round) -> ConvergenceCheck {
        let (grouping, semantic) = self.grouping(previous, current).await;
        let measure = ConvergenceMeasure::compute(previous, current, &grouping);
        let converged = measure.is_converged(&self.thresholds);

        debug!(
            "Round {} vs {}: set_changes={}, mean_confidence_delta={:.3}, missing={}, converged={}",
            previous.index,
            current.index,
            measure.set_changes,
            measure.mean_confidence_delta,
            measure.missing_agents.len(),
            converged
        );

        ConvergenceCheck {
            measure,
            converged,
            semantic,
        }
    }

    async fn grouping(&self, previous: &Round, current: &Round) -> (FactorGrouping, bool) {
        if self.mode == GroupingMode::Literal {
            return (FactorGrouping::literal(), false);
        }

        let names = distinct_factor_names([previous, current]);
        if names.len() < 2 {
            return (FactorGrouping::literal(), false);
        }

        let request = ModelRequest::structured(
            Stage::Grouping,
            PromptTemplate::moderator_system(),
            PromptTemplate::factor_grouping(&names),
            self.timeout,
        );

        match invoke_with_timeout(self.adapter.as_ref(), &self.moderator, &request).await {
            Ok(text) => match FactorGrouping::parse(&text) {
                Some(grouping) => (grouping, true),
                None => {
                    warn!("Could not parse factor grouping; comparing literal names for this round");
                    (FactorGrouping::literal(), false)
                }
            },
            Err(e) => {
                warn!(
                    "Factor grouping call failed ({}); comparing literal names for this round",
                    e
                );
                (FactorGrouping::literal(), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedAdapter, failure};
    use debate_domain::{AgentResponse, Factor};
    use std::collections::BTreeMap;

    fn round(index: usize, factors: &[(&str, &str, f64)]) -> Round {
        let mut by_agent: BTreeMap<AgentId, Vec<Factor>> = BTreeMap::new();
        for (agent, name, confidence) in factors {
            by_agent
                .entry(AgentId::new(*agent))
                .or_default()
                .push(Factor::new(*name, "j", *confidence));
        }
        let responses = by_agent
            .into_iter()
            .map(|(a, f)| (a.clone(), AgentResponse::factors(a, index, f, "")))
            .collect();
        Round::new(index, responses, BTreeMap::new())
    }

    fn evaluator(adapter: ScriptedAdapter, mode: GroupingMode) -> ConvergenceEvaluator<ScriptedAdapter> {
        ConvergenceEvaluator::new(
            Arc::new(adapter),
            AgentId::new("moderator"),
            mode,
            ConvergenceThresholds::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_semantic_grouping_converges_paraphrases() {
        let adapter = ScriptedAdapter::new(|_, _| {
            Ok(r#"{"Interest rates": "rates", "Policy rate": "rates"}"#.to_string())
        });
        let eval = evaluator(adapter, GroupingMode::Semantic);

        let check = eval
            .evaluate(
                &round(1, &[("a", "Interest rates", 0.8)]),
                &round(2, &[("a", "Policy rate", 0.8)]),
            )
            .await;

        assert!(check.semantic);
        assert!(check.converged);
    }

    #[tokio::test]
    async fn test_grouping_failure_falls_back_to_literal() {
        let adapter = ScriptedAdapter::new(|_, _| Err(failure("moderator down")));
        let eval = evaluator(adapter, GroupingMode::Semantic);

        let check = eval
            .evaluate(
                &round(1, &[("a", "Interest rates", 0.8)]),
                &round(2, &[("a", "Policy rate", 0.8)]),
            )
            .await;

        assert!(!check.semantic);
        assert!(!check.converged);
        assert_eq!(check.measure.set_changes, 2);
    }

    #[tokio::test]
    async fn test_literal_mode_makes_no_call() {
        let adapter = Arc::new(ScriptedAdapter::new(|_, _| Ok("{}".to_string())));
        let eval = ConvergenceEvaluator::new(
            Arc::clone(&adapter),
            AgentId::new("moderator"),
            GroupingMode::Literal,
            ConvergenceThresholds::default(),
            Duration::from_secs(5),
        );

        let check = eval
            .evaluate(&round(1, &[("a", "X", 0.5)]), &round(2, &[("a", "x", 0.55)]))
            .await;

        assert!(check.converged);
        assert!(adapter.calls().is_empty());
    }
}
