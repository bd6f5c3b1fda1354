//! Configuration file loading for llm-debate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `DEBATE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./debate.toml` or `./.debate.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/llm-debate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, FileAgentsConfig, FileConfig,
    FileConvergenceConfig, FileDebateConfig, FileJudgeConfig, FileMergeConfig, FileOutputConfig,
    FileParticipantConfig,
};
pub use loader::ConfigLoader;
