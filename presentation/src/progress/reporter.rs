//! Progress reporting for debate execution

use colored::Colorize;
use debate_application::DebateEventSink;
use debate_domain::{DebateEvent, Decision, MergeMethod};
use debate_domain::core::string::truncate;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// One-line description of an event, or `None` for events that only end the stream
fn describe(event: &DebateEvent) -> Option<String> {
    let line = match event {
        DebateEvent::BaselineOutput { agent, .. } | DebateEvent::ParallelBaselines { agent, .. } => {
            format!("{} baseline from {}", "v".green(), agent)
        }
        DebateEvent::CritiqueResults { responses } => {
            format!("{} critiques from {} agent(s)", "v".green(), responses.len())
        }
        DebateEvent::DebateRound {
            round_index,
            responses,
            failures,
        } => {
            let mut line = format!(
                "{} round {}: {} response(s)",
                "v".green(),
                round_index,
                responses.len()
            );
            if !failures.is_empty() {
                line.push_str(&format!(", {} failed", failures.len()).red().to_string());
            }
            line
        }
        DebateEvent::FreeformCritique {
            agent, round_index, ..
        } => format!("{} round {} critique from {}", "v".green(), round_index, agent),
        DebateEvent::Converged { round_index } => {
            format!("{} converged after round {}", "v".green(), round_index)
        }
        DebateEvent::MergeResults { merged } => {
            let method = match merged.method {
                MergeMethod::Llm => "llm",
                MergeMethod::Algorithmic => "algorithmic",
            };
            format!("{} merged {} factor(s) ({})", "v".green(), merged.len(), method)
        }
        DebateEvent::SummaryResults { .. } => format!("{} summary ready", "v".green()),
        DebateEvent::RefinedAnswer { .. } => format!("{} refined answer ready", "v".green()),
        DebateEvent::SynthesizedAnswer { .. } => {
            format!("{} synthesized answer ready", "v".green())
        }
        DebateEvent::JudgeResults { decision, .. } => {
            let decision = match decision {
                Decision::Accept => "ACCEPT".green(),
                Decision::Reject => "REJECT".yellow(),
            };
            format!("{} judge: {}", "->".cyan(), decision.bold())
        }
        DebateEvent::FinalAnswer { source, .. } => {
            format!("{} final answer ({})", "v".green(), source)
        }
        DebateEvent::AgentFailed {
            stage,
            agent,
            message,
        } => format!(
            "{} {} failed at {}: {}",
            "x".red(),
            agent,
            stage,
            truncate(message, 120)
        ),
        DebateEvent::FeedbackRequested { round_index } => format!(
            "{} feedback for round {} (empty line to skip)",
            "?".cyan().bold(),
            round_index + 1
        ),
        DebateEvent::Error { message } => {
            format!("{} debate failed: {}", "x".red().bold(), message)
        }
        DebateEvent::Complete => return None,
    };
    Some(line)
}

/// Renders debate events with a spinner on stderr
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix("debate");
        pb.set_message("waiting for agents...");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DebateEventSink for ProgressReporter {
    fn emit(&self, event: &DebateEvent) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };

        // The spinner is cleared before stdin is read and when the stream ends
        let pause = event.is_terminal() || matches!(event, DebateEvent::FeedbackRequested { .. });
        if pause {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
            if let Some(line) = describe(event) {
                eprintln!("{}", line);
            }
            return;
        }

        let pb = spinner.get_or_insert_with(Self::start_spinner);
        if let Some(line) = describe(event) {
            pb.println(line);
        }
        pb.set_message(format!("{} in progress...", event.name()));
    }
}

/// Simple text-based progress (no spinner), for non-terminal stderr
pub struct SimpleProgress;

impl DebateEventSink for SimpleProgress {
    fn emit(&self, event: &DebateEvent) {
        if let Some(line) = describe(event) {
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_domain::{AgentId, Stage};
    use std::collections::BTreeMap;

    fn plain(event: &DebateEvent) -> String {
        colored::control::set_override(false);
        describe(event).unwrap()
    }

    #[test]
    fn test_round_line_reports_failures() {
        let event = DebateEvent::DebateRound {
            round_index: 2,
            responses: BTreeMap::from([(AgentId::new("a"), "[]".to_string())]),
            failures: BTreeMap::from([(AgentId::new("b"), "timeout".to_string())]),
        };
        assert_eq!(plain(&event), "v round 2: 1 response(s), 1 failed");
    }

    #[test]
    fn test_agent_failure_line_is_truncated() {
        let event = DebateEvent::AgentFailed {
            stage: Stage::Critique,
            agent: AgentId::new("gpt"),
            message: "e".repeat(500),
        };
        let line = plain(&event);
        assert!(line.starts_with("x gpt failed at"));
        assert!(line.len() < 200);
    }

    #[test]
    fn test_judge_and_complete() {
        let event = DebateEvent::JudgeResults {
            decision: Decision::Reject,
            ratings: BTreeMap::new(),
            raw_rationale: String::new(),
        };
        assert_eq!(plain(&event), "-> judge: REJECT");
        assert!(describe(&DebateEvent::Complete).is_none());
    }

    #[test]
    fn test_reporter_survives_full_stream() {
        let reporter = ProgressReporter::new();
        reporter.emit(&DebateEvent::BaselineOutput {
            agent: AgentId::new("gpt"),
            text: "x".to_string(),
        });
        reporter.emit(&DebateEvent::FeedbackRequested { round_index: 1 });
        reporter.emit(&DebateEvent::Converged { round_index: 2 });
        reporter.emit(&DebateEvent::Complete);
        assert!(reporter.spinner.lock().unwrap().is_none());
    }
}
