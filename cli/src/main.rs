//! CLI entrypoint for llm-debate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use debate_application::{
    DebateEventSink, DebateObservers, EventFanout, FeedbackPort, NoEventSink, NoFeedback,
    NoTranscript, RunDebateUseCase, TranscriptSink,
};
use debate_domain::{OutputFormat, Question};
use debate_infrastructure::{
    ConfigLoader, FileConfig, JsonTranscriptWriter, JsonlEventLog, OpenAiCompatibleAdapter,
};
use debate_presentation::{
    Cli, ConsoleFormatter, InteractiveFeedback, ProgressReporter, SimpleProgress,
};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over -v when set
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Command-line flags take precedence over every config source
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(variant) = &cli.variant {
        config.debate.variant = variant.clone();
    }
    if !cli.agents.is_empty() {
        config.agents.select(&cli.agents);
    }
    if let Some(anchor) = &cli.anchor {
        config.agents.anchor = Some(anchor.clone());
    }
    if let Some(moderator) = &cli.moderator {
        config.agents.moderator = Some(moderator.clone());
    }
    if let Some(rounds) = cli.max_rounds {
        config.debate.max_rounds = rounds;
    }
    if let Some(top_k) = cli.top_k {
        config.debate.top_k = top_k;
    }
    if let Some(synthesizer) = &cli.synthesizer {
        config.debate.synthesizer = synthesizer.clone();
    }
    if let Some(feedback) = cli.feedback_override() {
        config.debate.feedback = feedback;
    }
    if let Some(format) = cli.output {
        config.output.format = Some(format.into());
    }
    if let Some(path) = &cli.transcript {
        config.output.transcript = Some(path.clone());
    }
    if let Some(path) = &cli.event_log {
        config.output.event_log = Some(path.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    info!("Starting llm-debate");

    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("{}", e))?
    };
    apply_overrides(&mut file_config, &cli);

    let config = file_config.to_debate_config()?;

    let question = match &cli.question {
        Some(q) => Question::try_new(q.as_str())?,
        None => bail!("A question is required, e.g. llm-debate \"Is coffee healthy?\""),
    };

    if !file_config.output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let adapter = Arc::new(OpenAiCompatibleAdapter::from_config(&file_config.agents)?);

    let cancellation = CancellationToken::new();
    {
        let token = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling the debate");
                token.cancel();
            }
        });
    }

    let use_case = RunDebateUseCase::new(adapter, config).with_cancellation(cancellation);

    // Observers
    let reporter: Box<dyn DebateEventSink> = if cli.quiet {
        Box::new(NoEventSink)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    };
    let event_log = file_config
        .output
        .event_log
        .as_ref()
        .and_then(JsonlEventLog::new);
    let mut events = EventFanout::new().with(reporter.as_ref());
    if let Some(log) = &event_log {
        events = events.with(log);
    }

    let feedback: Box<dyn FeedbackPort> = if use_case.config().feedback_enabled() {
        Box::new(InteractiveFeedback::new())
    } else {
        Box::new(NoFeedback)
    };
    let transcript: Box<dyn TranscriptSink> = match &file_config.output.transcript {
        Some(path) => Box::new(JsonTranscriptWriter::new(path)),
        None => Box::new(NoTranscript),
    };

    let observers = DebateObservers::new()
        .with_events(&events)
        .with_feedback(feedback.as_ref())
        .with_transcript(transcript.as_ref());

    let session = use_case.execute_with(question, &observers).await?;

    // Output results
    let output = match file_config.output.format.unwrap_or_default() {
        OutputFormat::Full => ConsoleFormatter::format(&session),
        OutputFormat::Answer => ConsoleFormatter::format_answer_only(&session),
        OutputFormat::Json => ConsoleFormatter::format_json(&session),
    };

    println!("{}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_file_values() {
        let mut config: FileConfig = toml::from_str(
            r#"
[debate]
max_rounds = 5

[[agents.participants]]
name = "gpt"

[[agents.participants]]
name = "claude"
"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "llm-debate",
            "-m",
            "claude",
            "-m",
            "mistral",
            "--max-rounds",
            "2",
            "--variant",
            "v2",
            "--output",
            "full",
            "q",
        ]);

        apply_overrides(&mut config, &cli);

        let names: Vec<_> = config.agents.participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["claude", "mistral"]);
        assert_eq!(config.debate.max_rounds, 2);
        assert_eq!(config.debate.variant, "v2");
        assert_eq!(config.output.format, Some(OutputFormat::Full));

        let debate = config.to_debate_config().unwrap();
        assert_eq!(debate.participants().len(), 2);
    }

    #[test]
    fn test_no_flags_keep_file_values() {
        let mut config = FileConfig::default();
        config.debate.feedback = true;
        let cli = Cli::parse_from(["llm-debate", "q"]);

        apply_overrides(&mut config, &cli);
        assert!(config.debate.feedback);
        assert_eq!(config.debate.max_rounds, 3);
        assert!(config.output.format.is_none());
    }
}
