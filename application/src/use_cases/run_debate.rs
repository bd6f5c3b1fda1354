//! Run Debate use case
//!
//! Orchestrates one debate session from question to final answer. The
//! configured [`ProtocolVariant`] is resolved once into a [`PipelinePlan`]
//! and every stage dispatches on that plan:
//!
//! | Variant | Seed | Rounds | Consolidation | Reference |
//! |---------|------|--------|---------------|-----------|
//! | factor-centric | factor lists | factor | merge + summary | anchor factors, summarized |
//! | prose-critique | anchor prose, critiques | factor | merge + summary | anchor prose |
//! | integrated-refinement | anchor prose, critiques | factor | merge + summary + refine | anchor prose |
//! | parallel-baseline | parallel prose | free-form | synthesis | anchor prose |
//!
//! Every stage completion is announced on the event sink. Fatal failures
//! seal the partial session with the error, persist it, emit `error` and
//! only then return `Err`.

use super::convergence::ConvergenceEvaluator;
use super::debate_loop::{DebateLoop, LoopError, LoopSettings, LoopState};
use super::fan_out::{FanOutExecutor, RoundParts, invoke_with_timeout};
use super::judge::{Judge, JudgeInput};
use super::merge::Merger;
use super::refine::{Refiner, Summarizer, non_blank};
use super::synthesize::Synthesizer;
use crate::config::DebateConfig;
use crate::ports::event_sink::{DebateEventSink, NoEventSink};
use crate::ports::feedback::{FeedbackError, FeedbackPort, NoFeedback};
use crate::ports::model_adapter::{AdapterError, ModelAdapter, ModelRequest, ResponseFormat};
use crate::ports::transcript::{NoTranscript, TranscriptSink};
use debate_domain::{
    AgentId, AgentResponse, AnswerSource, ConfigIssue, Consolidation, DebateEvent, DebateSession,
    DomainError, FinalAnswer, JudgeVerdict, MergedResult, PipelinePlan, PromptTemplate, Question,
    ReferenceBaseline, ReferenceSource, Round, RoundMode, SeedStage, Stage,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that end a debate session
#[derive(Error, Debug)]
pub enum RunDebateError {
    #[error("Invalid configuration: {}", describe_issues(.0))]
    InvalidConfig(Vec<ConfigIssue>),

    #[error("No agent produced a baseline")]
    NoBaselines,

    #[error("Reference baseline from {agent} failed: {message}")]
    ReferenceBaselineFailed { agent: AgentId, message: String },

    #[error("No agent produced a critique of the reference baseline")]
    NoCritiques,

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: AdapterError,
    },

    #[error("No reference baseline was recorded")]
    MissingReference,

    #[error("Debate loop error: {0}")]
    Loop(#[from] LoopError),

    #[error("Session error: {0}")]
    Session(#[from] DomainError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunDebateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunDebateError::Cancelled)
    }
}

fn describe_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outward collaborators of one run
pub struct DebateObservers<'a> {
    pub events: &'a dyn DebateEventSink,
    pub feedback: &'a dyn FeedbackPort,
    pub transcript: &'a dyn TranscriptSink,
}

impl<'a> DebateObservers<'a> {
    /// No events, no feedback, no transcript
    pub fn new() -> Self {
        Self {
            events: &NoEventSink,
            feedback: &NoFeedback,
            transcript: &NoTranscript,
        }
    }

    pub fn with_events(mut self, events: &'a dyn DebateEventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_feedback(mut self, feedback: &'a dyn FeedbackPort) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_transcript(mut self, transcript: &'a dyn TranscriptSink) -> Self {
        self.transcript = transcript;
        self
    }
}

impl Default for DebateObservers<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Agents and round zero produced by the seed stage
struct Seed {
    round: Round,
    reference: ReferenceBaseline,
}

/// Use case for running one debate session
pub struct RunDebateUseCase<A: ModelAdapter + 'static> {
    adapter: Arc<A>,
    config: DebateConfig,
    cancellation_token: Option<CancellationToken>,
}

impl<A: ModelAdapter + 'static> RunDebateUseCase<A> {
    pub fn new(adapter: Arc<A>, config: DebateConfig) -> Self {
        Self {
            adapter,
            config,
            cancellation_token: None,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Execute without observers
    pub async fn execute(&self, question: Question) -> Result<DebateSession, RunDebateError> {
        self.execute_with(question, &DebateObservers::new()).await
    }

    /// Execute, reporting to the given observers.
    ///
    /// On success the returned session is sealed with the final answer and
    /// verdict. On failure the partially filled session has already been
    /// sealed with the error and handed to the transcript sink.
    pub async fn execute_with(
        &self,
        question: Question,
        observers: &DebateObservers<'_>,
    ) -> Result<DebateSession, RunDebateError> {
        let issues = self.config.validate();
        for issue in issues.iter().filter(|i| !i.is_error()) {
            warn!("Configuration: {}", issue);
        }
        if DebateConfig::has_errors(&issues) {
            let err = RunDebateError::InvalidConfig(issues.into_iter().filter(|i| i.is_error()).collect());
            error!("{}", err);
            observers.events.emit(&DebateEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }

        info!(
            "Starting {} debate with {} agents",
            self.config.variant(),
            self.config.participants().len()
        );

        let mut session = DebateSession::new(question, self.config.variant());

        let result = match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RunDebateError::Cancelled),
                    result = self.run_pipeline(&mut session, observers) => result,
                }
            }
            None => self.run_pipeline(&mut session, observers).await,
        };

        match result {
            Ok(()) => {
                self.persist(&session, observers);
                observers.events.emit(&DebateEvent::Complete);
                Ok(session)
            }
            Err(e) => {
                error!("Debate failed: {}", e);
                session.seal_with_error(e.to_string());
                self.persist(&session, observers);
                observers.events.emit(&DebateEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn persist(&self, session: &DebateSession, observers: &DebateObservers<'_>) {
        if let Err(e) = observers.transcript.persist(session) {
            warn!("Failed to write transcript: {}", e);
        }
    }

    async fn run_pipeline(
        &self,
        session: &mut DebateSession,
        observers: &DebateObservers<'_>,
    ) -> Result<(), RunDebateError> {
        let plan = self.config.variant().plan();
        let question = session.question().content().to_string();
        let events = observers.events;

        // Stage 1: seed
        let seed = self.run_seed(&question, &plan, session, events).await?;
        session.set_reference(seed.reference.clone())?;
        session.record_round(seed.round.clone())?;

        // Stage 2: debate rounds
        let latest = self.run_rounds(&question, plan.rounds, seed.round, session, observers).await?;

        // Stage 3: consolidation
        let candidate = self
            .consolidate(&question, &plan, &seed.reference, &latest, session, events)
            .await?;

        // Stage 4: judge the sealed (candidate, reference) pair
        let (answer, verdict) = match candidate {
            Some(candidate) => {
                let verdict = self
                    .judge()
                    .judge(JudgeInput {
                        question: &question,
                        candidate: &candidate,
                        reference: &seed.reference,
                    })
                    .await;
                events.emit(&DebateEvent::JudgeResults {
                    decision: verdict.decision,
                    ratings: verdict.ratings.clone(),
                    raw_rationale: verdict.raw_rationale.clone(),
                });
                if verdict.is_accepted() {
                    (candidate, verdict)
                } else {
                    info!("Candidate rejected; falling back to the reference baseline");
                    (seed.reference.as_fallback(), verdict)
                }
            }
            None => {
                warn!("No candidate answer; falling back to the reference baseline");
                let verdict = JudgeVerdict::skipped("no candidate answer was produced");
                events.emit(&DebateEvent::JudgeResults {
                    decision: verdict.decision,
                    ratings: verdict.ratings.clone(),
                    raw_rationale: verdict.raw_rationale.clone(),
                });
                (seed.reference.as_fallback(), verdict)
            }
        };

        events.emit(&DebateEvent::FinalAnswer {
            text: answer.text.clone(),
            source: answer.source,
        });
        session.seal(answer, verdict)?;
        Ok(())
    }

    async fn run_seed(
        &self,
        question: &str,
        plan: &PipelinePlan,
        session: &mut DebateSession,
        events: &dyn DebateEventSink,
    ) -> Result<Seed, RunDebateError> {
        let anchor = self.anchor()?;
        let top_k = self.config.merge().top_k;

        match plan.seed {
            SeedStage::FactorLists => {
                info!("Stage 1: factor baselines");
                let request = self.request(
                    Stage::Baseline,
                    ResponseFormat::Structured,
                    PromptTemplate::factor_baseline(question, top_k),
                );
                let parts = self.fan_out_all(request, ResponseFormat::Structured).await;
                let (round, anchor_response) =
                    self.record_seed(parts, &anchor, session, events, |agent, response| {
                        DebateEvent::BaselineOutput {
                            agent: agent.clone(),
                            text: response.render(),
                        }
                    })?;

                let reference = match plan.reference {
                    ReferenceSource::AnchorFactorSummary => {
                        let factors = anchor_response.factor_list().unwrap_or_default();
                        let merged = MergedResult::from_single_agent(&anchor, factors);
                        let text = Summarizer::new(Arc::clone(&self.adapter), anchor.clone(), self.config.call_timeout())
                            .summarize(question, &merged)
                            .await
                            .map_err(|e| RunDebateError::ReferenceBaselineFailed {
                                agent: anchor.clone(),
                                message: e.to_string(),
                            })?;
                        debug!("Reference baseline summarized from {} factors", factors.len());
                        ReferenceBaseline::new(anchor.clone(), text)
                    }
                    ReferenceSource::AnchorProse => ReferenceBaseline::new(anchor.clone(), anchor_response.render()),
                };
                Ok(Seed { round, reference })
            }

            SeedStage::AnchorProseCritique => {
                info!("Stage 1: anchor baseline from {}", anchor);
                let request = self.request(
                    Stage::Baseline,
                    ResponseFormat::Prose,
                    PromptTemplate::prose_baseline(question),
                );
                let result = non_blank(invoke_with_timeout(self.adapter.as_ref(), &anchor, &request).await);
                let baseline = match result {
                    Ok(text) => text,
                    Err(e) => {
                        let mut failures = BTreeMap::new();
                        failures.insert(anchor.clone(), e.to_string());
                        session.record_baselines(BTreeMap::new(), failures)?;
                        events.emit(&DebateEvent::AgentFailed {
                            stage: Stage::Baseline,
                            agent: anchor.clone(),
                            message: e.to_string(),
                        });
                        return Err(RunDebateError::ReferenceBaselineFailed {
                            agent: anchor,
                            message: e.to_string(),
                        });
                    }
                };

                let mut baselines = BTreeMap::new();
                baselines.insert(anchor.clone(), AgentResponse::prose(anchor.clone(), 0, baseline.clone()));
                session.record_baselines(baselines, BTreeMap::new())?;
                events.emit(&DebateEvent::BaselineOutput {
                    agent: anchor.clone(),
                    text: baseline.clone(),
                });

                info!("Stage 1b: critiques of the anchor baseline");
                let request = self.request(
                    Stage::Critique,
                    ResponseFormat::Structured,
                    PromptTemplate::baseline_critique(question, &baseline, top_k),
                );
                let parts = self.fan_out_all(request, ResponseFormat::Structured).await;
                self.emit_failures(Stage::Critique, &parts.failures, events);
                let round = parts.into_round(0);
                events.emit(&DebateEvent::CritiqueResults {
                    responses: round.rendered(),
                });
                if round.is_exhausted() {
                    return Err(RunDebateError::NoCritiques);
                }

                Ok(Seed {
                    round,
                    reference: ReferenceBaseline::new(anchor, baseline),
                })
            }

            SeedStage::ParallelProse => {
                info!("Stage 1: parallel baselines");
                let request = self.request(
                    Stage::Baseline,
                    ResponseFormat::Prose,
                    PromptTemplate::prose_baseline(question),
                );
                let parts = self.fan_out_all(request, ResponseFormat::Prose).await;
                let (round, anchor_response) =
                    self.record_seed(parts, &anchor, session, events, |agent, response| {
                        DebateEvent::ParallelBaselines {
                            agent: agent.clone(),
                            text: response.render(),
                        }
                    })?;
                let reference = ReferenceBaseline::new(anchor, anchor_response.render());
                Ok(Seed { round, reference })
            }
        }
    }

    /// Record a seed fan-out as the session baselines and require the anchor.
    ///
    /// Returns round 0 and the anchor's response.
    fn record_seed(
        &self,
        parts: RoundParts,
        anchor: &AgentId,
        session: &mut DebateSession,
        events: &dyn DebateEventSink,
        announce: impl Fn(&AgentId, &AgentResponse) -> DebateEvent,
    ) -> Result<(Round, AgentResponse), RunDebateError> {
        session.record_baselines(parts.responses.clone(), parts.failures.clone())?;
        for (agent, response) in &parts.responses {
            events.emit(&announce(agent, response));
        }
        self.emit_failures(Stage::Baseline, &parts.failures, events);

        if parts.responses.is_empty() {
            return Err(RunDebateError::NoBaselines);
        }
        let Some(anchor_response) = parts.responses.get(anchor).cloned() else {
            let message = parts
                .failures
                .get(anchor)
                .cloned()
                .unwrap_or_else(|| "no response".to_string());
            return Err(RunDebateError::ReferenceBaselineFailed {
                agent: anchor.clone(),
                message,
            });
        };

        Ok((parts.into_round(0), anchor_response))
    }

    /// Drive the debate loop to termination.
    ///
    /// Returns every agent's latest response.
    async fn run_rounds(
        &self,
        question: &str,
        mode: RoundMode,
        seed: Round,
        session: &mut DebateSession,
        observers: &DebateObservers<'_>,
    ) -> Result<BTreeMap<AgentId, AgentResponse>, RunDebateError> {
        let events = observers.events;
        let settings = LoopSettings {
            mode,
            max_rounds: match mode {
                RoundMode::Factor => self.config.max_rounds(),
                RoundMode::FreeForm => self.config.freeform_rounds(),
            },
            feedback: self.config.feedback_enabled(),
            call_timeout: self.config.call_timeout(),
        };
        let evaluator = (mode == RoundMode::Factor).then(|| {
            ConvergenceEvaluator::new(
                Arc::clone(&self.adapter),
                self.moderator(),
                self.config.grouping(),
                *self.config.convergence(),
                self.config.call_timeout(),
            )
        });

        info!("Stage 2: debate rounds (up to {})", settings.max_rounds);
        let mut debate = DebateLoop::new(
            question,
            settings,
            FanOutExecutor::new(Arc::clone(&self.adapter)),
            evaluator,
            seed,
        )?;

        loop {
            match debate.state() {
                LoopState::Init | LoopState::RoundActive => {
                    let round = debate.step().await?;
                    self.emit_round(&round, mode, events);
                    session.record_round(round.clone())?;
                    if debate.state() == LoopState::Converged {
                        events.emit(&DebateEvent::Converged {
                            round_index: round.index,
                        });
                    }
                }
                LoopState::AwaitingFeedback => {
                    let latest = debate.latest_round();
                    events.emit(&DebateEvent::FeedbackRequested {
                        round_index: latest.index,
                    });
                    let feedback = match observers.feedback.request_feedback(latest).await {
                        Ok(feedback) => feedback,
                        Err(FeedbackError::Cancelled) => return Err(RunDebateError::Cancelled),
                        Err(e) => {
                            warn!("Feedback unavailable ({}); continuing without it", e);
                            None
                        }
                    };
                    debate.resume(feedback)?;
                }
                _ => break,
            }
        }

        let outcome = debate.terminate()?;
        info!("Debate loop ended after {} rounds: {:?}", debate.rounds().len() - 1, outcome);
        Ok(debate.into_latest())
    }

    fn emit_round(&self, round: &Round, mode: RoundMode, events: &dyn DebateEventSink) {
        match mode {
            RoundMode::Factor => events.emit(&DebateEvent::DebateRound {
                round_index: round.index,
                responses: round.rendered(),
                failures: round.failures.clone(),
            }),
            RoundMode::FreeForm => {
                for (agent, response) in &round.responses {
                    events.emit(&DebateEvent::FreeformCritique {
                        agent: agent.clone(),
                        round_index: round.index,
                        text: response.render(),
                    });
                }
                self.emit_failures(Stage::Round, &round.failures, events);
            }
        }
    }

    /// Produce the candidate answer. `None` when there was nothing to consolidate.
    async fn consolidate(
        &self,
        question: &str,
        plan: &PipelinePlan,
        reference: &ReferenceBaseline,
        latest: &BTreeMap<AgentId, AgentResponse>,
        session: &mut DebateSession,
        events: &dyn DebateEventSink,
    ) -> Result<Option<FinalAnswer>, RunDebateError> {
        let moderator = self.moderator();
        let timeout = self.config.call_timeout();

        match plan.consolidation {
            Consolidation::Merge { refine } => {
                info!("Stage 3: merge");
                let inputs: BTreeMap<AgentId, _> = latest
                    .iter()
                    .filter_map(|(agent, r)| r.factor_list().map(|f| (agent.clone(), f.to_vec())))
                    .collect();
                let merged = Merger::new(
                    Arc::clone(&self.adapter),
                    moderator.clone(),
                    *self.config.merge(),
                    timeout,
                )
                .merge(question, &inputs)
                .await;
                session.set_merged(merged.clone())?;
                events.emit(&DebateEvent::MergeResults {
                    merged: merged.clone(),
                });
                if merged.is_empty() {
                    return Ok(None);
                }

                let summary = Summarizer::new(Arc::clone(&self.adapter), moderator.clone(), timeout)
                    .summarize(question, &merged)
                    .await
                    .map_err(|source| RunDebateError::StageFailed {
                        stage: Stage::Summary,
                        source,
                    })?;
                session.set_summary(summary.clone())?;
                events.emit(&DebateEvent::SummaryResults {
                    text: summary.clone(),
                });

                if !refine {
                    return Ok(Some(FinalAnswer::new(summary, AnswerSource::Summary)));
                }

                info!("Stage 3b: refine");
                let refined = Refiner::new(Arc::clone(&self.adapter), moderator, timeout)
                    .refine(question, &reference.text, &summary)
                    .await
                    .map_err(|source| RunDebateError::StageFailed {
                        stage: Stage::Refine,
                        source,
                    })?;
                session.set_refined(refined.clone())?;
                events.emit(&DebateEvent::RefinedAnswer {
                    text: refined.clone(),
                });
                Ok(Some(FinalAnswer::new(refined, AnswerSource::Refined)))
            }

            Consolidation::Synthesize => {
                info!("Stage 3: synthesis ({:?})", self.config.synthesizer());
                let baselines: BTreeMap<AgentId, String> = session
                    .baselines()
                    .iter()
                    .map(|(agent, r)| (agent.clone(), r.render()))
                    .collect();
                let critiques = session.rounds().get(1..).unwrap_or_default();
                let synthesized = Synthesizer::new(
                    Arc::clone(&self.adapter),
                    moderator,
                    self.config.synthesizer(),
                    timeout,
                )
                .synthesize(question, reference, &baselines, critiques)
                .await
                .map_err(|source| RunDebateError::StageFailed {
                    stage: Stage::Synthesis,
                    source,
                })?;
                session.set_synthesized(synthesized.clone())?;
                events.emit(&DebateEvent::SynthesizedAnswer {
                    text: synthesized.clone(),
                });
                Ok(Some(FinalAnswer::new(synthesized, AnswerSource::Synthesized)))
            }
        }
    }

    fn judge(&self) -> Judge<A> {
        Judge::new(
            Arc::clone(&self.adapter),
            self.moderator(),
            self.config.judge().clone(),
            self.config.call_timeout(),
        )
    }

    fn anchor(&self) -> Result<AgentId, RunDebateError> {
        self.config.anchor().cloned().ok_or(RunDebateError::MissingReference)
    }

    fn moderator(&self) -> AgentId {
        self.config
            .moderator()
            .or_else(|| self.config.anchor())
            .cloned()
            .unwrap_or_else(|| AgentId::new("moderator"))
    }

    fn request(&self, stage: Stage, format: ResponseFormat, prompt: String) -> ModelRequest {
        match format {
            ResponseFormat::Structured => ModelRequest::structured(
                stage,
                PromptTemplate::participant_system(),
                prompt,
                self.config.call_timeout(),
            ),
            ResponseFormat::Prose => ModelRequest::prose(
                stage,
                PromptTemplate::participant_system(),
                prompt,
                self.config.call_timeout(),
            ),
        }
    }

    /// Send the same request to every participant and parse the results as round 0
    async fn fan_out_all(&self, request: ModelRequest, format: ResponseFormat) -> RoundParts {
        let calls = self
            .config
            .participants()
            .iter()
            .map(|agent| (agent.clone(), request.clone()))
            .collect();
        let results = FanOutExecutor::new(Arc::clone(&self.adapter)).execute(calls).await;
        RoundParts::parse(results, 0, format)
    }

    fn emit_failures(&self, stage: Stage, failures: &BTreeMap<AgentId, String>, events: &dyn DebateEventSink) {
        for (agent, message) in failures {
            events.emit(&DebateEvent::AgentFailed {
                stage,
                agent: agent.clone(),
                message: message.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::feedback::ChannelFeedback;
    use crate::ports::transcript::TranscriptError;
    use crate::testing::{RecordingSink, ScriptedAdapter, factor_json, failure};
    use debate_domain::{
        Decision, GroupingMode, MergeMethod, ProtocolVariant, RatingThresholds, SessionOutcome,
        SynthesizerStrategy,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    const PASSING_JUDGE: &str = "Completeness: 0.8\nCorrectness: 0.7\nClarity: 0.9";

    fn agents(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::new(*n)).collect()
    }

    fn config(variant: ProtocolVariant) -> DebateConfig {
        DebateConfig::new(agents(&["a", "b", "c"]))
            .with_variant(variant)
            .with_max_rounds(2)
            .with_freeform_rounds(1)
            .with_grouping(GroupingMode::Literal)
            .with_call_timeout(Duration::from_secs(5))
    }

    /// Adapter answering every stage with something plausible
    fn happy_adapter(judge: &'static str) -> ScriptedAdapter {
        ScriptedAdapter::new(move |agent, request| match request.stage {
            Stage::Baseline if request.format == ResponseFormat::Structured => {
                Ok(factor_json(&[("Supply", 0.9), ("Demand", 0.7)]))
            }
            Stage::Baseline => Ok(format!("Baseline by {}", agent)),
            Stage::Critique | Stage::Round if request.format == ResponseFormat::Structured => {
                Ok(factor_json(&[("Supply", 0.9), ("Demand", 0.6)]))
            }
            Stage::Critique | Stage::Round => Ok(format!("Critique by {}", agent)),
            Stage::Merge => Ok(
                r#"[{"name": "Supply", "justification": "agreed", "confidence": 0.9}]"#.to_string(),
            ),
            Stage::Summary => Ok("Consensus summary".to_string()),
            Stage::Refine => Ok("Refined answer".to_string()),
            Stage::Synthesis => Ok("Synthesized answer".to_string()),
            Stage::Judge => Ok(judge.to_string()),
            Stage::Grouping => Ok("{}".to_string()),
        })
    }

    #[derive(Default)]
    struct MemoryTranscript(Mutex<Vec<DebateSession>>);

    impl TranscriptSink for MemoryTranscript {
        fn persist(&self, session: &DebateSession) -> Result<(), TranscriptError> {
            self.0.lock().unwrap().push(session.clone());
            Ok(())
        }
    }

    async fn run(
        adapter: ScriptedAdapter,
        config: DebateConfig,
    ) -> (Result<DebateSession, RunDebateError>, RecordingSink, MemoryTranscript, Arc<ScriptedAdapter>) {
        let adapter = Arc::new(adapter);
        let sink = RecordingSink::default();
        let transcript = MemoryTranscript::default();
        let use_case = RunDebateUseCase::new(Arc::clone(&adapter), config);
        let observers = DebateObservers::new().with_events(&sink).with_transcript(&transcript);
        let result = use_case
            .execute_with(Question::new("Why are prices rising?"), &observers)
            .await;
        (result, sink, transcript, adapter)
    }

    #[tokio::test]
    async fn test_factor_centric_happy_path() {
        let (result, sink, transcript, adapter) =
            run(happy_adapter(PASSING_JUDGE), config(ProtocolVariant::FactorCentric)).await;

        let session = result.unwrap();
        let answer = session.final_answer().unwrap();
        assert_eq!(answer.source, AnswerSource::Summary);
        assert_eq!(answer.text, "Consensus summary");
        assert!(session.verdict().unwrap().is_accepted());

        // Reference is the anchor's factors, summarized
        assert_eq!(session.reference().unwrap().agent, AgentId::new("a"));
        assert_eq!(adapter.count(Stage::Summary), 2);

        // Identical rounds 1 and 2 converge
        assert_eq!(sink.count("converged"), 1);
        let names = sink.names();
        assert_eq!(names.iter().filter(|n| **n == "baseline_output").count(), 3);
        assert_eq!(names[names.len() - 2], "final_answer");
        assert_eq!(names.last(), Some(&"complete"));
        assert_eq!(transcript.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_indices_are_gap_free() {
        let (result, _, _, _) = run(
            happy_adapter(PASSING_JUDGE),
            config(ProtocolVariant::ProseCritique).with_max_rounds(3),
        )
        .await;

        let session = result.unwrap();
        let indices: Vec<_> = session.rounds().iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..session.rounds().len()).collect::<Vec<_>>());
        assert!(session.rounds().len() >= 2);
    }

    #[tokio::test]
    async fn test_judge_reject_falls_back_to_reference() {
        let judge = "Accuracy: 0.5\nCompleteness: 0.9";
        let config = config(ProtocolVariant::IntegratedRefinement).with_judge(
            RatingThresholds::empty()
                .with_criterion("accuracy", 0.6)
                .with_criterion("completeness", 0.6),
        );

        let (result, sink, _, _) = run(happy_adapter(judge), config).await;

        let session = result.unwrap();
        assert_eq!(session.verdict().unwrap().decision, Decision::Reject);
        let answer = session.final_answer().unwrap();
        assert_eq!(answer.source, AnswerSource::BaselineFallback);
        assert_eq!(answer.text, "Baseline by a");
        assert_eq!(session.refined(), Some("Refined answer"));
        assert!(sink.events().contains(&DebateEvent::FinalAnswer {
            text: "Baseline by a".to_string(),
            source: AnswerSource::BaselineFallback,
        }));
    }

    #[tokio::test]
    async fn test_integrated_refinement_accepts_refined_answer() {
        let (result, sink, _, adapter) =
            run(happy_adapter(PASSING_JUDGE), config(ProtocolVariant::IntegratedRefinement)).await;

        let session = result.unwrap();
        assert_eq!(session.final_answer().unwrap().source, AnswerSource::Refined);
        assert_eq!(adapter.count(Stage::Baseline), 1);
        assert_eq!(adapter.count(Stage::Critique), 3);
        assert!(adapter.prompts(Stage::Refine)[0].contains("Baseline by a"));
        assert_eq!(sink.count("critique_results"), 1);
        assert_eq!(sink.count("refined_answer"), 1);
    }

    #[tokio::test]
    async fn test_zero_baselines_is_fatal_without_final_answer() {
        let adapter = ScriptedAdapter::new(|_, _| Err(failure("outage")));

        let (result, sink, transcript, _) = run(adapter, config(ProtocolVariant::ParallelBaseline)).await;

        assert!(matches!(result, Err(RunDebateError::NoBaselines)));
        assert_eq!(sink.count("final_answer"), 0);
        assert_eq!(sink.count("complete"), 0);
        assert_eq!(sink.names().last(), Some(&"error"));
        assert_eq!(sink.count("agent_failed"), 3);

        let persisted = transcript.0.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(matches!(persisted[0].outcome(), Some(SessionOutcome::Failed { .. })));
        assert_eq!(persisted[0].baseline_failures().len(), 3);
    }

    #[tokio::test]
    async fn test_anchor_baseline_failure_aborts() {
        let adapter = ScriptedAdapter::new(|agent, _| match agent.as_str() {
            "a" => Err(failure("anchor down")),
            other => Ok(format!("Baseline by {}", other)),
        });

        let (result, sink, _, _) = run(adapter, config(ProtocolVariant::ParallelBaseline)).await;

        match result {
            Err(RunDebateError::ReferenceBaselineFailed { agent, message }) => {
                assert_eq!(agent, AgentId::new("a"));
                assert!(message.contains("anchor down"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(sink.count("parallel_baselines"), 2);
        assert_eq!(sink.count("final_answer"), 0);
    }

    #[tokio::test]
    async fn test_refine_failure_is_fatal() {
        let inner = happy_adapter(PASSING_JUDGE);
        let adapter = ScriptedAdapter::new(move |agent, request| match request.stage {
            Stage::Refine => Err(failure("refiner down")),
            _ => inner_call(&inner, agent, request),
        });

        let (result, sink, _, _) = run(adapter, config(ProtocolVariant::IntegratedRefinement)).await;

        assert!(matches!(
            result,
            Err(RunDebateError::StageFailed {
                stage: Stage::Refine,
                ..
            })
        ));
        assert_eq!(sink.count("final_answer"), 0);
        assert_eq!(sink.count("judge_results"), 0);
    }

    /// Delegate to another scripted adapter's closure without recording twice
    fn inner_call(inner: &ScriptedAdapter, agent: &AgentId, request: &ModelRequest) -> Result<String, AdapterError> {
        inner.answer(agent, request)
    }

    #[tokio::test]
    async fn test_parallel_baseline_pipeline() {
        let (result, sink, _, adapter) =
            run(happy_adapter(PASSING_JUDGE), config(ProtocolVariant::ParallelBaseline)).await;

        let session = result.unwrap();
        assert_eq!(session.final_answer().unwrap().source, AnswerSource::Synthesized);
        assert_eq!(session.rounds().len(), 2);
        assert_eq!(sink.count("parallel_baselines"), 3);
        assert_eq!(sink.count("freeform_critique"), 3);
        assert_eq!(adapter.count(Stage::Grouping), 0);
        assert!(adapter.prompts(Stage::Synthesis)[0].contains("Critique by b"));
    }

    #[tokio::test]
    async fn test_parallel_baseline_reference_refine_strategy() {
        let config = config(ProtocolVariant::ParallelBaseline)
            .with_synthesizer(SynthesizerStrategy::ReferenceRefine);

        let (result, _, _, adapter) = run(happy_adapter(PASSING_JUDGE), config).await;

        let session = result.unwrap();
        assert_eq!(session.synthesized(), Some("Refined answer"));
        assert_eq!(adapter.count(Stage::Synthesis), 0);
        assert_eq!(adapter.count(Stage::Refine), 1);
    }

    #[tokio::test]
    async fn test_merge_fallback_keeps_pipeline_running() {
        let inner = happy_adapter(PASSING_JUDGE);
        let adapter = ScriptedAdapter::new(move |agent, request| match request.stage {
            Stage::Merge => Ok("Sorry, I can't format that.".to_string()),
            _ => inner_call(&inner, agent, request),
        });

        let (result, _, _, _) = run(adapter, config(ProtocolVariant::ProseCritique)).await;

        let merged = result.unwrap().merged().cloned().unwrap();
        assert_eq!(merged.method, MergeMethod::Algorithmic);
        assert_eq!(merged.names()[0], "Supply");
    }

    #[tokio::test]
    async fn test_empty_merge_skips_judge_and_falls_back() {
        // Every agent keeps one private, weak factor and the moderator merge fails
        let inner = happy_adapter(PASSING_JUDGE);
        let adapter = ScriptedAdapter::new(move |agent, request| match request.stage {
            Stage::Critique | Stage::Round => {
                let name = format!("Only {}", agent);
                Ok(factor_json(&[(name.as_str(), 0.3)]))
            }
            Stage::Merge => Err(failure("moderator down")),
            _ => inner_call(&inner, agent, request),
        });

        let (result, _, _, adapter) = run(adapter, config(ProtocolVariant::ProseCritique)).await;

        let session = result.unwrap();
        assert!(session.merged().unwrap().is_empty());
        assert!(session.summary().is_none());
        assert!(session.verdict().unwrap().skipped);
        assert!(session.final_answer().unwrap().is_fallback());
        assert_eq!(adapter.count(Stage::Judge), 0);
    }

    #[tokio::test]
    async fn test_feedback_is_injected_into_next_round() {
        let adapter = Arc::new(happy_adapter(PASSING_JUDGE));
        let sink = RecordingSink::default();
        let (feedback, sender) = ChannelFeedback::new(Duration::from_secs(1));
        sender.send("mention wages".to_string()).await.unwrap();

        let use_case = RunDebateUseCase::new(
            Arc::clone(&adapter),
            config(ProtocolVariant::ProseCritique).with_feedback(true),
        );
        let observers = DebateObservers::new().with_events(&sink).with_feedback(&feedback);
        let session = use_case
            .execute_with(Question::new("Why are prices rising?"), &observers)
            .await
            .unwrap();

        assert_eq!(sink.count("feedback_requested"), 1);
        assert_eq!(session.rounds()[2].human_feedback.as_deref(), Some("mention wages"));
        assert!(
            adapter
                .prompts(Stage::Round)
                .iter()
                .filter(|p| p.contains("mention wages"))
                .count()
                == 3
        );
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_call() {
        let config = DebateConfig::new(Vec::new());

        let (result, sink, transcript, adapter) = run(happy_adapter(PASSING_JUDGE), config).await;

        assert!(matches!(result, Err(RunDebateError::InvalidConfig(_))));
        assert!(adapter.calls().is_empty());
        assert_eq!(sink.names(), vec!["error"]);
        assert!(transcript.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_ends_run() {
        let adapter = Arc::new(
            happy_adapter(PASSING_JUDGE).with_delay("a", Duration::from_secs(30)),
        );
        let token = CancellationToken::new();
        let use_case = RunDebateUseCase::new(Arc::clone(&adapter), config(ProtocolVariant::FactorCentric))
            .with_cancellation(token.clone());
        token.cancel();

        let sink = RecordingSink::default();
        let observers = DebateObservers::new().with_events(&sink);
        let result = use_case.execute_with(Question::new("Q"), &observers).await;

        assert!(result.as_ref().is_err_and(|e| e.is_cancelled()));
        assert_eq!(sink.names(), vec!["error"]);
    }
}
