//! Moderator prose stages: consensus summary and baseline refinement.

use super::fan_out::invoke_with_timeout;
use crate::ports::model_adapter::{AdapterError, ModelAdapter, ModelRequest};
use debate_domain::{AgentId, MergedResult, PromptTemplate, Stage};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Turns a merged factor list into consensus prose
pub struct Summarizer<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    moderator: AgentId,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> Summarizer<A> {
    pub fn new(adapter: Arc<A>, moderator: AgentId, timeout: Duration) -> Self {
        Self {
            adapter,
            moderator,
            timeout,
        }
    }

    pub async fn summarize(&self, question: &str, merged: &MergedResult) -> Result<String, AdapterError> {
        info!("Summarizing {} consensus factors", merged.len());
        let request = ModelRequest::prose(
            Stage::Summary,
            PromptTemplate::moderator_system(),
            PromptTemplate::summary(question, merged),
            self.timeout,
        );
        non_blank(invoke_with_timeout(self.adapter.as_ref(), &self.moderator, &request).await)
    }
}

/// Rewrites a detailed baseline so it integrates debate insights
pub struct Refiner<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    moderator: AgentId,
    timeout: Duration,
}

impl<A: ModelAdapter + 'static> Refiner<A> {
    pub fn new(adapter: Arc<A>, moderator: AgentId, timeout: Duration) -> Self {
        Self {
            adapter,
            moderator,
            timeout,
        }
    }

    pub async fn refine(&self, question: &str, baseline: &str, insights: &str) -> Result<String, AdapterError> {
        info!("Refining the reference baseline");
        let request = ModelRequest::prose(
            Stage::Refine,
            PromptTemplate::moderator_system(),
            PromptTemplate::refine(question, baseline, insights),
            self.timeout,
        );
        non_blank(invoke_with_timeout(self.adapter.as_ref(), &self.moderator, &request).await)
    }
}

/// A blank answer is as useless as a failed call
pub(crate) fn non_blank(result: Result<String, AdapterError>) -> Result<String, AdapterError> {
    let text = result?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(AdapterError::InvalidResponse("empty response".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedAdapter, failure};
    use debate_domain::Factor;

    #[tokio::test]
    async fn test_summary_prompt_carries_merged_factors() {
        let adapter = Arc::new(ScriptedAdapter::new(|_, _| Ok("  Consensus prose. ".to_string())));
        let summarizer = Summarizer::new(Arc::clone(&adapter), AgentId::new("m"), Duration::from_secs(5));
        let merged = MergedResult::from_single_agent(&AgentId::new("a"), &[Factor::new("Supply", "j", 0.9)]);

        let text = summarizer.summarize("Why?", &merged).await.unwrap();

        assert_eq!(text, "Consensus prose.");
        let calls = adapter.calls();
        assert_eq!(calls[0].0, AgentId::new("m"));
        assert!(calls[0].2.contains("1. Supply"));
    }

    #[tokio::test]
    async fn test_refine_passes_baseline_and_insights() {
        let adapter = Arc::new(ScriptedAdapter::new(|_, _| Ok("refined".to_string())));
        let refiner = Refiner::new(Arc::clone(&adapter), AgentId::new("m"), Duration::from_secs(5));

        refiner.refine("Q", "the baseline", "the insights").await.unwrap();

        let prompt = &adapter.prompts(Stage::Refine)[0];
        assert!(prompt.contains("the baseline"));
        assert!(prompt.contains("the insights"));
    }

    #[tokio::test]
    async fn test_failures_and_blank_answers_are_errors() {
        let failing = Refiner::new(
            Arc::new(ScriptedAdapter::new(|_, _| Err(failure("down")))),
            AgentId::new("m"),
            Duration::from_secs(5),
        );
        assert!(failing.refine("Q", "b", "i").await.is_err());

        let blank = Refiner::new(
            Arc::new(ScriptedAdapter::new(|_, _| Ok("   ".to_string()))),
            AgentId::new("m"),
            Duration::from_secs(5),
        );
        assert!(matches!(
            blank.refine("Q", "b", "i").await,
            Err(AdapterError::InvalidResponse(_))
        ));
    }
}
