//! Bounded debate rounds as an explicit state machine.
//!
//! ```text
//! Init ──step──▶ RoundActive ──step──▶ ...
//!   │                 │
//!   │                 ├──▶ AwaitingFeedback ──resume──▶ RoundActive
//!   │                 ├──▶ Converged ─────────┐
//!   │                 ├──▶ MaxRoundsReached ──┼──terminate──▶ Terminated
//!   │                 └──▶ Exhausted ─────────┘
//! ```
//!
//! The loop never drives itself: the orchestrator calls [`DebateLoop::step`]
//! to run one round, [`DebateLoop::resume`] to leave `AwaitingFeedback`, and
//! [`DebateLoop::terminate`] once a terminal state is reached. This keeps the
//! human-feedback suspension point visible to the caller instead of hiding
//! a blocking read inside the loop.
//!
//! Round 0 is the seed handed to [`DebateLoop::new`]. Each later round gives
//! every agent its own latest response and all peers' latest responses. An
//! agent whose call fails keeps its previous response as context and is
//! recorded as failed in that round.

use super::convergence::ConvergenceEvaluator;
use super::fan_out::{FanOutExecutor, RoundParts};
use crate::ports::model_adapter::{ModelAdapter, ModelRequest, ResponseFormat};
use debate_domain::{AgentId, AgentResponse, Factor, PromptTemplate, Round, RoundMode, Stage};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    RoundActive,
    AwaitingFeedback,
    Converged,
    MaxRoundsReached,
    /// Every agent failed in the last round
    Exhausted,
    Terminated,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Converged,
    MaxRoundsReached,
    Exhausted,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopError {
    #[error("Cannot {action} while the debate loop is in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: LoopState,
    },

    #[error("Seed round must have index 0 and at least one response")]
    InvalidSeed,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub mode: RoundMode,
    /// Ceiling on rounds after the seed
    pub max_rounds: usize,
    /// Suspend for feedback between rounds
    pub feedback: bool,
    pub call_timeout: Duration,
}

pub struct DebateLoop<A: ModelAdapter + 'static> {
    question: String,
    settings: LoopSettings,
    executor: FanOutExecutor<A>,
    evaluator: Option<ConvergenceEvaluator<A>>,
    state: LoopState,
    /// Never empty: the seed is round 0
    rounds: Vec<Round>,
    latest: BTreeMap<AgentId, AgentResponse>,
    pending_feedback: Option<String>,
}

impl<A: ModelAdapter + 'static> DebateLoop<A> {
    /// Create a loop from its seed round.
    ///
    /// Only agents with a seed response take part. Convergence is only
    /// evaluated in factor mode and only when an evaluator is given.
    pub fn new(
        question: impl Into<String>,
        settings: LoopSettings,
        executor: FanOutExecutor<A>,
        evaluator: Option<ConvergenceEvaluator<A>>,
        seed: Round,
    ) -> Result<Self, LoopError> {
        if seed.index != 0 || seed.is_exhausted() {
            return Err(LoopError::InvalidSeed);
        }
        let state = if settings.max_rounds == 0 {
            LoopState::MaxRoundsReached
        } else {
            LoopState::Init
        };
        Ok(Self {
            question: question.into(),
            settings,
            executor,
            evaluator,
            state,
            latest: seed.responses.clone(),
            rounds: vec![seed],
            pending_feedback: None,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn latest_round(&self) -> &Round {
        &self.rounds[self.rounds.len() - 1]
    }

    /// Latest successful response of every participating agent
    pub fn latest_responses(&self) -> &BTreeMap<AgentId, AgentResponse> {
        &self.latest
    }

    pub fn latest_factors(&self) -> BTreeMap<AgentId, Vec<Factor>> {
        self.latest
            .iter()
            .filter_map(|(agent, r)| r.factor_list().map(|f| (agent.clone(), f.to_vec())))
            .collect()
    }

    /// Run one round and move to the next state.
    ///
    /// Valid in `Init` and `RoundActive`. Returns the recorded round.
    pub async fn step(&mut self) -> Result<Round, LoopError> {
        if !matches!(self.state, LoopState::Init | LoopState::RoundActive) {
            return Err(LoopError::InvalidTransition {
                action: "run a round",
                state: self.state,
            });
        }

        let index = self.rounds.len();
        let feedback = self.pending_feedback.take();
        info!("Debate round {} ({} agents)", index, self.latest.len());

        let calls = self
            .latest
            .keys()
            .map(|agent| (agent.clone(), self.request_for(agent, feedback.as_deref())))
            .collect();
        let results = self.executor.execute(calls).await;
        let format = match self.settings.mode {
            RoundMode::Factor => ResponseFormat::Structured,
            RoundMode::FreeForm => ResponseFormat::Prose,
        };
        let round = RoundParts::parse(results, index, format)
            .into_round(index)
            .with_feedback(feedback);

        for (agent, response) in &round.responses {
            self.latest.insert(agent.clone(), response.clone());
        }
        self.rounds.push(round.clone());
        self.state = self.next_state(&round).await;

        Ok(round)
    }

    /// Leave `AwaitingFeedback`. Blank feedback counts as none.
    pub fn resume(&mut self, feedback: Option<String>) -> Result<(), LoopError> {
        if self.state != LoopState::AwaitingFeedback {
            return Err(LoopError::InvalidTransition {
                action: "resume",
                state: self.state,
            });
        }
        self.pending_feedback = feedback.filter(|f| !f.trim().is_empty());
        self.state = LoopState::RoundActive;
        Ok(())
    }

    /// Move from a terminal-success state to `Terminated`
    pub fn terminate(&mut self) -> Result<LoopOutcome, LoopError> {
        let outcome = match self.state {
            LoopState::Converged => LoopOutcome::Converged,
            LoopState::MaxRoundsReached => LoopOutcome::MaxRoundsReached,
            LoopState::Exhausted => LoopOutcome::Exhausted,
            state => {
                return Err(LoopError::InvalidTransition {
                    action: "terminate",
                    state,
                });
            }
        };
        self.state = LoopState::Terminated;
        Ok(outcome)
    }

    /// Consume the loop, returning the latest response per agent
    pub fn into_latest(self) -> BTreeMap<AgentId, AgentResponse> {
        self.latest
    }

    fn request_for(&self, agent: &AgentId, feedback: Option<&str>) -> ModelRequest {
        let own = self.latest.get(agent).map(|r| r.render()).unwrap_or_default();
        let peers: Vec<(String, String)> = self
            .latest
            .iter()
            .filter(|(other, _)| *other != agent)
            .map(|(other, r)| (other.to_string(), r.render()))
            .collect();

        match self.settings.mode {
            RoundMode::Factor => ModelRequest::structured(
                Stage::Round,
                PromptTemplate::participant_system(),
                PromptTemplate::factor_critique(&self.question, &own, &peers, feedback),
                self.settings.call_timeout,
            ),
            RoundMode::FreeForm => ModelRequest::prose(
                Stage::Round,
                PromptTemplate::participant_system(),
                PromptTemplate::freeform_critique(&self.question, &own, &peers, feedback),
                self.settings.call_timeout,
            ),
        }
    }

    async fn next_state(&self, round: &Round) -> LoopState {
        if round.is_exhausted() {
            warn!("Every agent failed in round {}; stopping the debate", round.index);
            return LoopState::Exhausted;
        }

        if self.settings.mode == RoundMode::Factor
            && round.index >= 2
            && let Some(evaluator) = &self.evaluator
        {
            let previous = &self.rounds[round.index - 1];
            if evaluator.evaluate(previous, round).await.converged {
                info!("Debate converged at round {}", round.index);
                return LoopState::Converged;
            }
        }

        if round.index >= self.settings.max_rounds {
            info!("Reached the round ceiling ({})", self.settings.max_rounds);
            LoopState::MaxRoundsReached
        } else if self.settings.feedback {
            LoopState::AwaitingFeedback
        } else {
            LoopState::RoundActive
        }
    }
}
