//! Configuration validation issues.
//!
//! Validation never fails fast: every problem found is reported as a
//! [`ConfigIssue`], and callers decide what to do with warnings.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the debate cannot start.
    Error,
    /// Non-fatal: the debate runs but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// No participating agents.
    NoAgents,
    /// The same agent is listed twice.
    DuplicateAgent,
    /// The anchor is not one of the participants.
    AnchorNotParticipant,
    /// An agent has no model endpoint configured.
    MissingEndpoint,
    /// Round ceiling is zero.
    ZeroRounds,
    /// Merge top-K is zero.
    ZeroTopK,
    /// A threshold lies outside `[0, 1]`.
    ThresholdOutOfRange,
    /// A single agent debates with itself.
    SingleAgent,
    /// No judge criteria: every candidate is accepted.
    NoJudgeCriteria,
    /// Per-call timeout is zero.
    ZeroTimeout,
    /// A setting names a value outside its allowed set.
    InvalidEnumValue,
    /// A name field is blank.
    EmptyName,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
