//! Logging infrastructure: structured debate event logging.
//!
//! Provides [`JsonlEventLog`], a JSONL file writer that implements
//! the [`DebateEventSink`](debate_application::DebateEventSink) port.

mod jsonl_events;

pub use jsonl_events::JsonlEventLog;
