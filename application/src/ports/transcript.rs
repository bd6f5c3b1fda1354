//! Transcript sink port
//!
//! Receives one snapshot of the sealed session per run, including runs
//! that ended in an error.

use debate_domain::DebateSession;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub trait TranscriptSink: Send + Sync {
    fn persist(&self, session: &DebateSession) -> Result<(), TranscriptError>;
}

/// Discards transcripts
pub struct NoTranscript;

impl TranscriptSink for NoTranscript {
    fn persist(&self, _session: &DebateSession) -> Result<(), TranscriptError> {
        Ok(())
    }
}
