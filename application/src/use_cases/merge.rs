//! Consensus merge of the final factor lists.

use super::fan_out::invoke_with_timeout;
use crate::ports::model_adapter::{ModelAdapter, ModelRequest};
use debate_domain::debate::merge::parse_merged_factors;
use debate_domain::{
    AgentId, Factor, MergeMethod, MergeParams, MergedResult, PromptTemplate, Stage,
    algorithmic_merge, debate::factor::factors_to_json,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Merges factor lists through the moderator, with a deterministic fallback.
///
/// The moderator path groups paraphrased factors. If the call fails or its
/// answer is unusable, [`algorithmic_merge`] runs over the same inputs.
/// The merge itself never fails; an empty result means there was nothing
/// to merge.
pub struct Merger<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    moderator: AgentId,
    params: MergeParams,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> Merger<A> {
    pub fn new(adapter: Arc<A>, moderator: AgentId, params: MergeParams, timeout: Duration) -> Self {
        Self {
            adapter,
            moderator,
            params,
            timeout,
        }
    }

    pub async fn merge(&self, question: &str, inputs: &BTreeMap<AgentId, Vec<Factor>>) -> MergedResult {
        if inputs.values().all(|f| f.is_empty()) {
            warn!("No factors to merge");
            return MergedResult::ranked(Vec::new(), MergeMethod::Algorithmic, self.params.top_k);
        }

        let lists: Vec<(String, String)> = inputs
            .iter()
            .map(|(agent, factors)| (agent.to_string(), factors_to_json(factors)))
            .collect();
        let request = ModelRequest::structured(
            Stage::Merge,
            PromptTemplate::moderator_system(),
            PromptTemplate::merge_factors(question, &lists, self.params.top_k),
            self.timeout,
        );

        match invoke_with_timeout(self.adapter.as_ref(), &self.moderator, &request).await {
            Ok(text) => match parse_merged_factors(&text, inputs, self.params.top_k) {
                Ok(merged) => {
                    info!("Merged into {} factors", merged.len());
                    return merged;
                }
                Err(e) => warn!("Unusable merge response ({}); using algorithmic merge", e),
            },
            Err(e) => warn!("Merge call failed ({}); using algorithmic merge", e),
        }

        let merged = algorithmic_merge(inputs, &self.params);
        info!("Algorithmic merge kept {} factors", merged.len());
        merged
    }
}
