//! Console output formatter for debate sessions

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use debate_domain::{
    AgentResponse, DebateSession, Decision, Factor, ResponseContent, SessionOutcome,
};

/// Formats debate sessions for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format every stage of the session
    pub fn format(session: &DebateSession) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("LLM Debate Results"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            session.question()
        ));
        output.push_str(&format!(
            "{} {}\n\n",
            "Variant:".cyan().bold(),
            session.variant()
        ));

        // Baselines
        if !session.baselines().is_empty() || !session.baseline_failures().is_empty() {
            output.push_str(&Self::section_header("Baselines"));
            for (agent, response) in session.baselines() {
                output.push_str(&Self::agent_block(agent.as_str(), response));
            }
            for (agent, error) in session.baseline_failures() {
                output.push_str(&Self::failure_block(agent.as_str(), error));
            }
        }

        if let Some(reference) = session.reference() {
            output.push_str(&Self::section_header(&format!(
                "Reference Baseline ({})",
                reference.agent
            )));
            output.push_str(&format!("\n{}\n", reference.text));
        }

        // Rounds (round 0 is the seed)
        for round in session.rounds() {
            let title = if round.index == 0 {
                "Round 0 (seed)".to_string()
            } else {
                format!("Round {}", round.index)
            };
            output.push_str(&Self::section_header(&title));
            if let Some(feedback) = &round.human_feedback {
                output.push_str(&format!("{} {}\n", "Feedback:".magenta().bold(), feedback));
            }
            for (agent, response) in &round.responses {
                output.push_str(&Self::agent_block(agent.as_str(), response));
            }
            for (agent, error) in &round.failures {
                output.push_str(&Self::failure_block(agent.as_str(), error));
            }
        }

        if let Some(merged) = session.merged() {
            output.push_str(&Self::section_header("Merged Factors"));
            for (rank, m) in merged.factors.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} {}\n     {}\n",
                    rank + 1,
                    m.factor.name.bold(),
                    format!(
                        "(endorsed by {}, confidence {:.2})",
                        m.endorsement_count, m.factor.confidence
                    )
                    .dimmed(),
                    m.factor.justification
                ));
            }
        }

        for (title, text) in [
            ("Consensus Summary", session.summary()),
            ("Refined Answer", session.refined()),
            ("Synthesized Answer", session.synthesized()),
        ] {
            if let Some(text) = text {
                output.push_str(&Self::section_header(title));
                output.push_str(&format!("\n{}\n", text));
            }
        }

        if let Some(verdict) = session.verdict() {
            output.push_str(&Self::section_header("Judge"));
            let decision = match verdict.decision {
                Decision::Accept => "ACCEPT".green().bold(),
                Decision::Reject => "REJECT".yellow().bold(),
            };
            output.push_str(&format!("{} {}", "Decision:".cyan().bold(), decision));
            if verdict.skipped {
                output.push_str(&format!(" {}", "(skipped)".dimmed()));
            } else if verdict.parse_failed {
                output.push_str(&format!(" {}", "(ratings unreadable)".dimmed()));
            }
            output.push('\n');
            for (criterion, rating) in &verdict.ratings {
                output.push_str(&format!("  * {}: {:.2}\n", criterion, rating));
            }
        }

        if let Some(answer) = session.final_answer() {
            output.push_str(&Self::section_header(&format!(
                "Final Answer ({})",
                answer.source
            )));
            output.push_str(&format!("\n{}\n", answer.text));
        }

        if let Some(SessionOutcome::Failed { error }) = session.outcome() {
            output.push_str(&format!("\n{} {}\n", "Debate failed:".red().bold(), error));
        }

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(session: &DebateSession) -> String {
        serde_json::to_string_pretty(session).unwrap_or_else(|_| "{}".to_string())
    }

    /// Final answer only (concise output)
    pub fn format_answer_only(session: &DebateSession) -> String {
        match (session.final_answer(), session.outcome()) {
            (Some(answer), _) => format!("{}\n", answer.text),
            (None, Some(SessionOutcome::Failed { error })) => {
                format!("{} {}\n", "Debate failed:".red().bold(), error)
            }
            (None, _) => String::new(),
        }
    }

    fn agent_block(agent: &str, response: &AgentResponse) -> String {
        let body = match &response.content {
            ResponseContent::Factors { factors } => Self::factor_lines(factors),
            ResponseContent::Prose { text } => text.clone(),
        };
        format!("\n{}\n{}\n", format!("── {} ──", agent).yellow().bold(), body)
    }

    fn failure_block(agent: &str, error: &str) -> String {
        format!(
            "\n{}\nError: {}\n",
            format!("── {} ──", agent).red().bold(),
            error
        )
    }

    fn factor_lines(factors: &[Factor]) -> String {
        if factors.is_empty() {
            return "(no factors)".dimmed().to_string();
        }
        factors
            .iter()
            .map(|f| {
                format!(
                    "  * {} ({:.2})\n{}",
                    f.name,
                    f.confidence,
                    Self::indent(&f.justification, "      ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, session: &DebateSession) -> String {
        Self::format(session)
    }

    fn format_json(&self, session: &DebateSession) -> String {
        Self::format_json(session)
    }

    fn format_answer_only(&self, session: &DebateSession) -> String {
        Self::format_answer_only(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_domain::{
        AgentId, AnswerSource, FinalAnswer, JudgeVerdict, ProtocolVariant, Question,
        ReferenceBaseline, Round,
    };
    use std::collections::BTreeMap;

    fn session() -> DebateSession {
        let mut session = DebateSession::new(
            Question::new("Is remote work more productive?"),
            ProtocolVariant::FactorCentric,
        );
        let gpt = AgentId::new("gpt");
        let seed = AgentResponse::factors(
            gpt.clone(),
            0,
            vec![Factor::new("Fewer interruptions", "Quiet home offices.", 0.8)],
            "[]",
        );
        session
            .set_reference(ReferenceBaseline::new(gpt.clone(), "Mostly yes."))
            .unwrap();
        session
            .record_round(Round::new(
                0,
                BTreeMap::from([(gpt.clone(), seed)]),
                BTreeMap::from([(AgentId::new("claude"), "timed out".to_string())]),
            ))
            .unwrap();
        session
    }

    #[test]
    fn test_full_output_lists_stages() {
        colored::control::set_override(false);
        let mut session = session();
        session
            .seal(
                FinalAnswer::new("Mostly yes.", AnswerSource::BaselineFallback),
                JudgeVerdict::skipped("no candidate"),
            )
            .unwrap();

        let output = ConsoleFormatter::format(&session);
        assert!(output.contains("Is remote work more productive?"));
        assert!(output.contains("Round 0 (seed)"));
        assert!(output.contains("* Fewer interruptions (0.80)"));
        assert!(output.contains("── claude ──\nError: timed out"));
        assert!(output.contains("Decision: REJECT (skipped)"));
        assert!(output.contains("Final Answer (baseline-fallback)"));
    }

    #[test]
    fn test_answer_only() {
        let mut session = session();
        session
            .seal(
                FinalAnswer::new("Mostly yes.", AnswerSource::Summary),
                JudgeVerdict::skipped("n/a"),
            )
            .unwrap();
        assert_eq!(ConsoleFormatter::format_answer_only(&session), "Mostly yes.\n");
    }

    #[test]
    fn test_failed_session_shows_error() {
        colored::control::set_override(false);
        let mut session = session();
        session.seal_with_error("summary failed");
        assert_eq!(
            ConsoleFormatter::format_answer_only(&session),
            "Debate failed: summary failed\n"
        );
        assert!(ConsoleFormatter::format(&session).contains("Debate failed: summary failed"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&session());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["variant"], serde_json::to_value(ProtocolVariant::FactorCentric).unwrap());
    }
}
