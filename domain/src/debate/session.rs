//! DebateSession aggregate.
//!
//! The session collects everything one run produced, in order. It is
//! append-only while the run is active and read-only once sealed, either
//! with a final answer and verdict or with the error that ended the run.
//! A sealed session is what gets written to the transcript.

use super::answer::{FinalAnswer, ReferenceBaseline};
use super::judge::JudgeVerdict;
use super::merge::MergedResult;
use super::response::{AgentResponse, Round};
use super::variant::ProtocolVariant;
use crate::core::agent::AgentId;
use crate::core::error::DomainError;
use crate::core::question::Question;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a sealed session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Answered,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSession {
    question: Question,
    variant: ProtocolVariant,
    baselines: BTreeMap<AgentId, AgentResponse>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    baseline_failures: BTreeMap<AgentId, String>,
    reference: Option<ReferenceBaseline>,
    rounds: Vec<Round>,
    merged: Option<MergedResult>,
    summary: Option<String>,
    refined: Option<String>,
    synthesized: Option<String>,
    final_answer: Option<FinalAnswer>,
    verdict: Option<JudgeVerdict>,
    outcome: Option<SessionOutcome>,
}

impl DebateSession {
    pub fn new(question: Question, variant: ProtocolVariant) -> Self {
        Self {
            question,
            variant,
            baselines: BTreeMap::new(),
            baseline_failures: BTreeMap::new(),
            reference: None,
            rounds: Vec::new(),
            merged: None,
            summary: None,
            refined: None,
            synthesized: None,
            final_answer: None,
            verdict: None,
            outcome: None,
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_sealed() {
            Err(DomainError::SessionSealed)
        } else {
            Ok(())
        }
    }

    pub fn record_baselines(
        &mut self,
        baselines: BTreeMap<AgentId, AgentResponse>,
        failures: BTreeMap<AgentId, String>,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.baselines.extend(baselines);
        self.baseline_failures.extend(failures);
        Ok(())
    }

    pub fn set_reference(&mut self, reference: ReferenceBaseline) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.reference = Some(reference);
        Ok(())
    }

    /// Append the next round. Indices must be exactly `0, 1, 2, ...`.
    pub fn record_round(&mut self, round: Round) -> Result<(), DomainError> {
        self.ensure_open()?;
        let expected = self.rounds.len();
        if round.index != expected {
            return Err(DomainError::RoundOutOfOrder {
                expected,
                got: round.index,
            });
        }
        self.rounds.push(round);
        Ok(())
    }

    pub fn set_merged(&mut self, merged: MergedResult) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.merged = Some(merged);
        Ok(())
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.summary = Some(summary.into());
        Ok(())
    }

    pub fn set_refined(&mut self, refined: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.refined = Some(refined.into());
        Ok(())
    }

    pub fn set_synthesized(&mut self, synthesized: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.synthesized = Some(synthesized.into());
        Ok(())
    }

    /// Seal with the answer shown to the user and the verdict that chose it
    pub fn seal(&mut self, answer: FinalAnswer, verdict: JudgeVerdict) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.final_answer = Some(answer);
        self.verdict = Some(verdict);
        self.outcome = Some(SessionOutcome::Answered);
        Ok(())
    }

    /// Seal a failed run, keeping whatever partial state exists.
    ///
    /// Sealing an already sealed session is a no-op.
    pub fn seal_with_error(&mut self, error: impl Into<String>) {
        if self.is_sealed() {
            return;
        }
        self.outcome = Some(SessionOutcome::Failed {
            error: error.into(),
        });
    }

    pub fn is_sealed(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn baselines(&self) -> &BTreeMap<AgentId, AgentResponse> {
        &self.baselines
    }

    pub fn baseline_failures(&self) -> &BTreeMap<AgentId, String> {
        &self.baseline_failures
    }

    pub fn reference(&self) -> Option<&ReferenceBaseline> {
        self.reference.as_ref()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn merged(&self) -> Option<&MergedResult> {
        self.merged.as_ref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn refined(&self) -> Option<&str> {
        self.refined.as_deref()
    }

    pub fn synthesized(&self) -> Option<&str> {
        self.synthesized.as_deref()
    }

    pub fn final_answer(&self) -> Option<&FinalAnswer> {
        self.final_answer.as_ref()
    }

    pub fn verdict(&self) -> Option<&JudgeVerdict> {
        self.verdict.as_ref()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(SessionOutcome::Failed { error }) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::answer::AnswerSource;

    fn session() -> DebateSession {
        DebateSession::new(
            Question::new("Is Rust a good fit?"),
            ProtocolVariant::FactorCentric,
        )
    }

    fn empty_round(index: usize) -> Round {
        Round::new(index, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_rounds_must_be_gap_free() {
        let mut s = session();
        s.record_round(empty_round(0)).unwrap();
        s.record_round(empty_round(1)).unwrap();
        assert_eq!(
            s.record_round(empty_round(3)),
            Err(DomainError::RoundOutOfOrder {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            s.record_round(empty_round(1)),
            Err(DomainError::RoundOutOfOrder {
                expected: 2,
                got: 1
            })
        );
        let indices: Vec<_> = s.rounds().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_sealed_session_is_read_only() {
        let mut s = session();
        s.seal(
            FinalAnswer::new("answer", AnswerSource::Summary),
            JudgeVerdict::skipped("test"),
        )
        .unwrap();

        assert!(s.is_sealed());
        assert_eq!(s.record_round(empty_round(0)), Err(DomainError::SessionSealed));
        assert_eq!(s.set_summary("late"), Err(DomainError::SessionSealed));
        assert_eq!(s.outcome(), Some(&SessionOutcome::Answered));
    }

    #[test]
    fn test_seal_with_error_keeps_partial_state() {
        let mut s = session();
        s.record_round(empty_round(0)).unwrap();
        s.seal_with_error("refine failed");
        s.seal_with_error("second error is ignored");

        assert_eq!(s.error(), Some("refine failed"));
        assert_eq!(s.rounds().len(), 1);
        assert!(s.final_answer().is_none());
    }

    #[test]
    fn test_serializes_to_transcript_json() {
        let mut s = session();
        s.seal_with_error("boom");
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["variant"], "factor-centric");
        assert_eq!(value["outcome"]["status"], "failed");
        assert_eq!(value["question"]["content"], "Is Rust a good fit?");
    }
}
