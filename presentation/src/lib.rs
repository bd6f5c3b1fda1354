//! Presentation layer for llm-debate
//!
//! This crate contains CLI definitions, output formatters,
//! progress reporters, and the interactive feedback prompt.

pub mod cli;
pub mod feedback;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use feedback::InteractiveFeedback;
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
