//! Concurrent fan-out of model calls.
//!
//! Every call is spawned on its own task and the executor waits for all of
//! them. A failing, timed-out or panicking call becomes a per-agent failure
//! in the result map; it never cancels its siblings. There is no retry here:
//! retry policy belongs to the model adapter.

use crate::ports::model_adapter::{AdapterError, ModelAdapter, ModelRequest, ResponseFormat};
use debate_domain::{AgentId, AgentResponse, Round, parse_factor_list};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Per-agent outcome of a fan-out, keyed by agent
pub type FanOutResults = BTreeMap<AgentId, Result<String, AdapterError>>;

pub struct FanOutExecutor<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
}

impl<A: ModelAdapter + 'static> Clone for FanOutExecutor<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<A: ModelAdapter + 'static> FanOutExecutor<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    /// Issue all calls concurrently and wait for every one of them.
    ///
    /// The returned map has exactly one entry per distinct agent in `calls`.
    pub async fn execute(&self, calls: Vec<(AgentId, ModelRequest)>) -> FanOutResults {
        let mut join_set = DetachOnDrop(JoinSet::new());
        let mut pending = BTreeSet::new();

        for (agent, request) in calls {
            if !pending.insert(agent.clone()) {
                warn!("Duplicate call for agent {} ignored", agent);
                continue;
            }
            let adapter = Arc::clone(&self.adapter);
            join_set.0.spawn(async move {
                let result = invoke_with_timeout(adapter.as_ref(), &agent, &request).await;
                (agent, result)
            });
        }

        let mut results = BTreeMap::new();

        while let Some(joined) = join_set.0.join_next().await {
            match joined {
                Ok((agent, result)) => {
                    match &result {
                        Ok(_) => debug!("Agent {} responded", agent),
                        Err(e) => warn!("Agent {} failed: {}", agent, e),
                    }
                    pending.remove(&agent);
                    results.insert(agent, result);
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        for agent in pending {
            results.insert(
                agent,
                Err(AdapterError::Other(
                    "call task ended without a result".to_string(),
                )),
            );
        }

        results
    }
}

/// Lets in-flight calls run to completion when the fan-out is dropped.
///
/// Their results are discarded; a dropped `JoinSet` would abort them instead.
struct DetachOnDrop<T: 'static>(JoinSet<T>);

impl<T: 'static> Drop for DetachOnDrop<T> {
    fn drop(&mut self) {
        self.0.detach_all();
    }
}

/// Invoke one agent, bounded by the request's timeout
pub async fn invoke_with_timeout<A: ModelAdapter + ?Sized>(
    adapter: &A,
    agent: &AgentId,
    request: &ModelRequest,
) -> Result<String, AdapterError> {
    match tokio::time::timeout(request.timeout, adapter.invoke(agent, request)).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(request.timeout)),
    }
}

/// Parsed responses and failures of one fan-out
#[derive(Debug, Clone, Default)]
pub struct RoundParts {
    pub responses: BTreeMap<AgentId, AgentResponse>,
    pub failures: BTreeMap<AgentId, String>,
}

impl RoundParts {
    /// Parse raw results for round `index`.
    ///
    /// Structured results must contain a non-empty factor list and prose
    /// results must be non-blank; anything else is recorded as a failure.
    pub fn parse(results: FanOutResults, index: usize, format: ResponseFormat) -> Self {
        let mut parts = Self::default();
        for (agent, result) in results {
            let parsed = result.map_err(|e| e.to_string()).and_then(|text| match format {
                ResponseFormat::Structured => match parse_factor_list(&text) {
                    Some(factors) if !factors.is_empty() => {
                        Ok(AgentResponse::factors(agent.clone(), index, factors, text))
                    }
                    _ => Err("response did not contain a valid factor list".to_string()),
                },
                ResponseFormat::Prose if text.trim().is_empty() => {
                    Err("empty response".to_string())
                }
                ResponseFormat::Prose => Ok(AgentResponse::prose(agent.clone(), index, text.trim())),
            });
            match parsed {
                Ok(response) => {
                    parts.responses.insert(agent, response);
                }
                Err(message) => {
                    parts.failures.insert(agent, message);
                }
            }
        }
        parts
    }

    pub fn into_round(self, index: usize) -> Round {
        Round::new(index, self.responses, self.failures)
    }
}
