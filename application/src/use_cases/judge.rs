//! Judging the candidate answer against the reference baseline.

use super::fan_out::invoke_with_timeout;
use crate::ports::model_adapter::{ModelAdapter, ModelRequest};
use debate_domain::{
    AgentId, FinalAnswer, JudgeVerdict, PromptTemplate, RatingThresholds, ReferenceBaseline, Stage,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct JudgeInput<'a> {
    pub question: &'a str,
    pub candidate: &'a FinalAnswer,
    pub reference: &'a ReferenceBaseline,
}

pub struct Judge<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    judge: AgentId,
    thresholds: RatingThresholds,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> Judge<A> {
    pub fn new(adapter: Arc<A>, judge: AgentId, thresholds: RatingThresholds, timeout: Duration) -> Self {
        Self {
            adapter,
            judge,
            thresholds,
            timeout,
        }
    }

    /// Rate the candidate. A failed judge call yields a rejecting verdict.
    pub async fn judge(&self, input: JudgeInput<'_>) -> JudgeVerdict {
        let request = ModelRequest::prose(
            Stage::Judge,
            PromptTemplate::judge_system(),
            PromptTemplate::judge(
                input.question,
                &input.reference.text,
                &input.candidate.text,
                self.thresholds.criteria(),
            ),
            self.timeout,
        );

        let verdict = match invoke_with_timeout(self.adapter.as_ref(), &self.judge, &request).await {
            Ok(raw) => JudgeVerdict::from_response(raw, &self.thresholds),
            Err(e) => {
                warn!("Judge call failed: {}", e);
                JudgeVerdict::unavailable(format!("judge unavailable: {}", e))
            }
        };

        if verdict.parse_failed && !verdict.ratings.is_empty() {
            warn!("Judge response is missing some criteria; treating them as failed");
        }
        info!("Judge decision: {}", verdict.decision);
        verdict
    }
}
