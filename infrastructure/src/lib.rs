//! Infrastructure layer for llm-debate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: model endpoints, the event log and
//! transcripts, plus configuration file loading.

pub mod config;
pub mod logging;
pub mod providers;
pub mod transcript;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentsConfig, FileConfig, FileDebateConfig,
    FileJudgeConfig, FileOutputConfig, FileParticipantConfig,
};
pub use logging::JsonlEventLog;
pub use providers::{Endpoint, OpenAiCompatibleAdapter, RetryPolicy};
pub use transcript::JsonTranscriptWriter;
