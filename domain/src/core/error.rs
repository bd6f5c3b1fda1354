//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No agents configured for the debate")]
    NoAgents,

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid agent: {0}")]
    InvalidAgent(String),

    #[error("Unknown protocol variant: {0}")]
    UnknownVariant(String),

    #[error("Round {got} recorded out of order (expected round {expected})")]
    RoundOutOfOrder { expected: usize, got: usize },

    #[error("Debate session is sealed and can no longer be modified")]
    SessionSealed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::NoAgents.is_cancelled());
        assert!(!DomainError::SessionSealed.is_cancelled());
    }

    #[test]
    fn test_round_out_of_order_display() {
        let error = DomainError::RoundOutOfOrder {
            expected: 2,
            got: 3,
        };
        assert_eq!(
            error.to_string(),
            "Round 3 recorded out of order (expected round 2)"
        );
    }
}
