//! Agent roster from TOML (`[agents]` section)

use debate_domain::{AgentId, ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Raw agent roster from TOML
///
/// # Example
///
/// ```toml
/// [agents]
/// anchor = "gpt"                           # reference baseline (default: first participant)
/// moderator = "claude"                     # merge/summary/judge calls (default: anchor)
/// base_url = "https://api.openai.com/v1"   # default endpoint for participants
/// api_key_env = "OPENAI_API_KEY"
///
/// [[agents.participants]]
/// name = "gpt"
/// model = "gpt-4o"
///
/// [[agents.participants]]
/// name = "llama"
/// model = "llama3.1"
/// base_url = "http://localhost:11434/v1"
/// api_key_env = ""                          # no Authorization header
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentsConfig {
    pub anchor: Option<String>,
    pub moderator: Option<String>,
    pub base_url: String,
    pub api_key_env: String,
    pub participants: Vec<FileParticipantConfig>,
}

impl Default for FileAgentsConfig {
    fn default() -> Self {
        Self {
            anchor: None,
            moderator: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            participants: Vec::new(),
        }
    }
}

/// One debating agent and the endpoint serving it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParticipantConfig {
    /// Agent name used in prompts, events and transcripts
    pub name: String,
    /// Model identifier sent to the endpoint (default: the name)
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key; empty for none
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl FileParticipantConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            base_url: None,
            api_key_env: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

impl FileAgentsConfig {
    /// Participant agent ids, skipping blank names
    pub fn parse_participants(&self) -> (Vec<AgentId>, Vec<ConfigIssue>) {
        let mut agents = Vec::new();
        let mut issues = Vec::new();
        for (i, participant) in self.participants.iter().enumerate() {
            match participant.name.parse::<AgentId>() {
                Ok(agent) => agents.push(agent),
                Err(_) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyName,
                    format!("agents.participants[{}]: name cannot be empty", i),
                )),
            }
        }
        (agents, issues)
    }

    pub fn parse_anchor(&self) -> (Option<AgentId>, Vec<ConfigIssue>) {
        Self::parse_optional("anchor", self.anchor.as_deref())
    }

    pub fn parse_moderator(&self) -> (Option<AgentId>, Vec<ConfigIssue>) {
        Self::parse_optional("moderator", self.moderator.as_deref())
    }

    fn parse_optional(field: &str, value: Option<&str>) -> (Option<AgentId>, Vec<ConfigIssue>) {
        match value {
            None => (None, vec![]),
            Some(name) => match name.parse::<AgentId>() {
                Ok(agent) => (Some(agent), vec![]),
                Err(_) => (
                    None,
                    vec![ConfigIssue::error(
                        ConfigIssueCode::EmptyName,
                        format!("agents.{}: name cannot be empty", field),
                    )],
                ),
            },
        }
    }

    /// The moderator must be served by some endpoint
    pub fn check_moderator_endpoint(&self) -> Vec<ConfigIssue> {
        match self.parse_moderator().0 {
            Some(moderator) if !self.participants.iter().any(|p| p.name.trim() == moderator.as_str()) => {
                vec![ConfigIssue::error(
                    ConfigIssueCode::MissingEndpoint,
                    format!(
                        "agents.moderator: '{}' must also be listed in [[agents.participants]]",
                        moderator
                    ),
                )]
            }
            _ => vec![],
        }
    }

    pub fn participant(&self, agent: &AgentId) -> Option<&FileParticipantConfig> {
        self.participants.iter().find(|p| p.name.trim() == agent.as_str())
    }

    /// Keep only the named participants, in the given order.
    ///
    /// Names without a configured endpoint get one on the default endpoint
    /// with the name as the model.
    pub fn select(&mut self, names: &[String]) {
        let selected = names
            .iter()
            .map(|name| {
                self.participants
                    .iter()
                    .find(|p| p.name.trim() == name.trim())
                    .cloned()
                    .unwrap_or_else(|| FileParticipantConfig::named(name.trim()))
            })
            .collect();
        self.participants = selected;
    }
}
