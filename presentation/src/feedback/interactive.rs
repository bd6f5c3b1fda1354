//! Interactive feedback between debate rounds.
//!
//! When the loop suspends for feedback, the user sees the round that just
//! finished and can steer the next one:
//!
//! ```text
//! ── Round 1 ──
//!   claude: [{"name":"Fewer interruptions","justification":...
//!   gpt:    [{"name":"Commute time saved","justification":...
//!
//! feedback> consider team communication costs
//! ```
//!
//! | Input | Effect |
//! |-------|--------|
//! | empty line | no feedback, the next round starts |
//! | any text | injected into every agent's next prompt |
//! | `/quit` | abort the session |

use async_trait::async_trait;
use colored::Colorize;
use debate_application::{FeedbackError, FeedbackPort};
use debate_domain::Round;
use debate_domain::core::string::truncate;
use std::io::{self, Write};

/// Reads one line of feedback per round from stdin
pub struct InteractiveFeedback;

impl InteractiveFeedback {
    pub fn new() -> Self {
        Self
    }

    fn display_round(round: &Round) {
        eprintln!();
        eprintln!("{}", format!("── Round {} ──", round.index).cyan().bold());
        for (agent, response) in &round.responses {
            let text = response.render().replace('\n', " ");
            eprintln!("  {}: {}", agent.as_str().yellow(), truncate(&text, 80));
        }
        for agent in round.failures.keys() {
            eprintln!("  {}: {}", agent.as_str().red(), "(failed)".dimmed());
        }
        eprintln!();
    }

    fn read_line() -> Result<String, FeedbackError> {
        eprint!("{} ", "feedback>".magenta().bold());
        io::stderr()
            .flush()
            .map_err(|e| FeedbackError::Io(format!("Failed to flush stderr: {}", e)))?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| FeedbackError::Io(format!("Failed to read input: {}", e)))?;
        Ok(input)
    }
}

impl Default for InteractiveFeedback {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret one input line
fn parse_feedback(input: &str) -> Result<Option<String>, FeedbackError> {
    let trimmed = input.trim();
    match trimmed {
        "" => Ok(None),
        "/quit" | "/q" => Err(FeedbackError::Cancelled),
        text => Ok(Some(text.to_string())),
    }
}

#[async_trait]
impl FeedbackPort for InteractiveFeedback {
    async fn request_feedback(&self, latest: &Round) -> Result<Option<String>, FeedbackError> {
        Self::display_round(latest);
        let input = tokio::task::spawn_blocking(Self::read_line)
            .await
            .map_err(|e| FeedbackError::Io(format!("Input task failed: {}", e)))??;
        parse_feedback(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line_is_no_feedback() {
        assert_eq!(parse_feedback("\n"), Ok(None));
        assert_eq!(parse_feedback("   \r\n"), Ok(None));
    }

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(
            parse_feedback("  weigh the costs  \n"),
            Ok(Some("weigh the costs".to_string()))
        );
    }

    #[test]
    fn test_quit_cancels() {
        assert_eq!(parse_feedback("/quit\n"), Err(FeedbackError::Cancelled));
    }
}
