//! Application layer for llm-debate
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::DebateConfig;
pub use ports::{
    event_sink::{DebateEventSink, EventFanout, NoEventSink},
    feedback::{ChannelFeedback, FeedbackError, FeedbackPort, NoFeedback},
    model_adapter::{AdapterError, AdapterErrorKind, ModelAdapter, ModelRequest, ResponseFormat},
    transcript::{NoTranscript, TranscriptError, TranscriptSink},
};
pub use use_cases::debate_loop::{DebateLoop, LoopError, LoopOutcome, LoopSettings, LoopState};
pub use use_cases::fan_out::{FanOutExecutor, FanOutResults};
pub use use_cases::run_debate::{DebateObservers, RunDebateError, RunDebateUseCase};
