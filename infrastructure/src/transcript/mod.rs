//! Session transcripts.
//!
//! [`JsonTranscriptWriter`] implements the
//! [`TranscriptSink`](debate_application::TranscriptSink) port by writing
//! the sealed session as pretty-printed JSON.

mod json_writer;

pub use json_writer::JsonTranscriptWriter;
