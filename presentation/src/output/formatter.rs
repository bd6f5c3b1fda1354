//! Output formatter trait

use debate_domain::DebateSession;

/// Trait for formatting finished debate sessions
pub trait OutputFormatter {
    /// Every stage of the session
    fn format(&self, session: &DebateSession) -> String;

    /// Format as JSON
    fn format_json(&self, session: &DebateSession) -> String;

    /// Final answer only (concise output)
    fn format_answer_only(&self, session: &DebateSession) -> String;
}
