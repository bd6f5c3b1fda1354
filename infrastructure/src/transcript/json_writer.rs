//! Pretty JSON transcript of one sealed debate session

use debate_application::{TranscriptError, TranscriptSink};
use debate_domain::DebateSession;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct TranscriptRecord<'a> {
    written_at: String,
    session: &'a DebateSession,
}

/// Writes the session to a fixed path, replacing any previous transcript
pub struct JsonTranscriptWriter {
    path: PathBuf,
}

impl JsonTranscriptWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for JsonTranscriptWriter {
    fn persist(&self, session: &DebateSession) -> Result<(), TranscriptError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let record = TranscriptRecord {
            written_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            session,
        };

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &record)
            .map_err(|e| TranscriptError::Serialization(e.to_string()))?;
        writeln!(writer)?;
        writer.flush()?;

        info!("Transcript written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_domain::{
        AgentId, AnswerSource, FinalAnswer, JudgeVerdict, ProtocolVariant, Question,
        ReferenceBaseline,
    };

    fn sealed_session() -> DebateSession {
        let mut session = DebateSession::new(
            Question::new("Why is the sky blue?"),
            ProtocolVariant::IntegratedRefinement,
        );
        session
            .set_reference(ReferenceBaseline::new(AgentId::new("gpt"), "Rayleigh scattering."))
            .unwrap();
        session
            .seal(
                FinalAnswer::new("Rayleigh scattering of sunlight.", AnswerSource::Refined),
                JudgeVerdict::skipped("no criteria"),
            )
            .unwrap();
        session
    }

    #[test]
    fn test_writes_session_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("last.json");
        let writer = JsonTranscriptWriter::new(&path);

        let session = sealed_session();
        writer.persist(&session).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["written_at"].is_string());
        assert_eq!(value["session"]["variant"], serde_json::to_value(session.variant()).unwrap());

        let restored: DebateSession = serde_json::from_value(value["session"].clone()).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_failed_session_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.json");
        let mut session =
            DebateSession::new(Question::new("q"), ProtocolVariant::FactorCentric);
        session.seal_with_error("no baselines");

        JsonTranscriptWriter::new(&path).persist(&session).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("no baselines"));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = JsonTranscriptWriter::new(blocker.join("t.json"))
            .persist(&sealed_session())
            .unwrap_err();
        assert!(matches!(err, TranscriptError::Io(_)));
    }
}
