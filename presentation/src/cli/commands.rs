//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for debate results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every stage: baselines, rounds, merge, verdict and answer
    Full,
    /// Only the final answer
    Answer,
    /// The sealed session as JSON
    Json,
}

impl From<OutputFormat> for debate_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => debate_domain::OutputFormat::Full,
            OutputFormat::Answer => debate_domain::OutputFormat::Answer,
            OutputFormat::Json => debate_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for llm-debate
#[derive(Parser, Debug)]
#[command(name = "llm-debate")]
#[command(author, version, about = "Multi-agent LLM debate - agents critique each other until they agree")]
#[command(long_about = r#"
llm-debate puts one question to several LLM agents and lets them debate it.

Every protocol variant follows the same outline:
1. Seed: one or all agents answer the question (factor lists or prose)
2. Rounds: agents critique each other until they converge or hit the round limit
3. Consolidation: factors are merged and summarized, or critiques synthesized
4. Judge: the candidate is compared with the anchor's baseline; a rejected
   candidate falls back to the baseline

Variants: factor-centric (v1), prose-critique (v2),
          integrated-refinement (v3, default), parallel-baseline (v4)

Configuration files are loaded from (in priority order):
1. DEBATE_* environment variables
2. --config <path>     Explicit config file
3. ./debate.toml       Project-level config
4. ~/.config/llm-debate/config.toml   Global config

Example:
  llm-debate -m gpt -m claude -m gemini "Should we adopt a four-day work week?"
  llm-debate --variant v4 --output full "What caused the 2008 financial crisis?"
"#)]
pub struct Cli {
    /// The question to debate
    pub question: Option<String>,

    /// Protocol variant (factor-centric, prose-critique, integrated-refinement,
    /// parallel-baseline or v1..v4)
    #[arg(long, value_name = "VARIANT")]
    pub variant: Option<String>,

    /// Participating agents (can be specified multiple times)
    #[arg(short = 'm', long = "agent", value_name = "AGENT")]
    pub agents: Vec<String>,

    /// Agent whose baseline is the reference answer
    #[arg(long, value_name = "AGENT")]
    pub anchor: Option<String>,

    /// Agent that runs merge, summary and judge calls
    #[arg(long, value_name = "AGENT")]
    pub moderator: Option<String>,

    /// Maximum number of critique rounds
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,

    /// Number of merged factors kept
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Synthesizer strategy for parallel-baseline (dedicated, reference-refine)
    #[arg(long, value_name = "STRATEGY")]
    pub synthesizer: Option<String>,

    /// Ask for human feedback between rounds
    #[arg(long, conflicts_with = "no_feedback")]
    pub feedback: bool,

    /// Never ask for feedback, even if the config enables it
    #[arg(long)]
    pub no_feedback: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Write the sealed session as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Append every progress event as JSONL to this path
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// `Some(true)` / `Some(false)` when a flag overrides the config
    pub fn feedback_override(&self) -> Option<bool> {
        if self.no_feedback {
            Some(false)
        } else if self.feedback {
            Some(true)
        } else {
            None
        }
    }
}
