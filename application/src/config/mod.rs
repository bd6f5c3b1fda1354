//! Application-level configuration.
//!
//! - [`DebateConfig`] - immutable debate settings resolved before a session starts

pub mod debate_config;

pub use debate_config::DebateConfig;
