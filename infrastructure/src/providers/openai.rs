//! OpenAI-compatible chat completion adapter
//!
//! Every participating agent is routed to an endpoint speaking the
//! `/chat/completions` protocol (OpenAI, OpenRouter, Ollama, vLLM and
//! friends). Endpoints are resolved once from the `[agents]` config
//! section; the API key is read from the environment at that point.

use super::retry::RetryPolicy;
use crate::config::{FileAgentsConfig, FileParticipantConfig};
use async_trait::async_trait;
use debate_application::{AdapterError, ModelAdapter, ModelRequest, ResponseFormat};
use debate_domain::AgentId;
use debate_domain::core::string::truncate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument, warn};

const STRUCTURED_HINT: &str =
    "Respond with the requested JSON only. Do not wrap it in prose or code fences.";

// ============================================================================
// Security Utilities
// ============================================================================

/// Mask API key for safe display
fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Sanitize provider error bodies so credentials never reach logs or transcripts
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check the configured api_key_env.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") {
        return "API rate limit exceeded.".to_string();
    }

    truncate(error.trim(), 300)
}

// ============================================================================
// Endpoint
// ============================================================================

/// Where and how one agent is served
#[derive(Clone, PartialEq)]
pub struct Endpoint {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Endpoint {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn resolve(participant: &FileParticipantConfig, defaults: &FileAgentsConfig) -> Self {
        let base_url = participant
            .base_url
            .as_deref()
            .unwrap_or(&defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        let key_env = participant
            .api_key_env
            .as_deref()
            .unwrap_or(&defaults.api_key_env);

        let api_key = if key_env.is_empty() {
            None
        } else {
            match std::env::var(key_env) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    warn!(
                        "Agent '{}': {} is not set, calling {} without credentials",
                        participant.name, key_env, base_url
                    );
                    None
                }
            }
        };

        Self {
            model: participant.model_name().to_string(),
            base_url,
            api_key,
            max_tokens: participant.max_tokens,
            temperature: participant.temperature,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

// ============================================================================
// API Types (OpenAI Compatible)
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn map_status(status: StatusCode, body: &str) -> AdapterError {
    let message = sanitize_api_error(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        AdapterError::RateLimited(message)
    } else {
        AdapterError::Provider {
            status: status.as_u16(),
            message,
        }
    }
}

fn map_transport(e: reqwest::Error, request: &ModelRequest) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout(request.timeout)
    } else {
        AdapterError::Connection(sanitize_api_error(&e.to_string()))
    }
}

// ============================================================================
// Adapter Implementation
// ============================================================================

/// [`ModelAdapter`] backed by OpenAI-compatible HTTP endpoints
pub struct OpenAiCompatibleAdapter {
    client: Client,
    endpoints: HashMap<AgentId, Endpoint>,
    retry: RetryPolicy,
}

impl OpenAiCompatibleAdapter {
    pub fn new() -> Result<Self, AdapterError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints: HashMap::new(),
            retry: RetryPolicy::default(),
        })
    }

    /// Build an adapter serving every configured participant
    pub fn from_config(agents: &FileAgentsConfig) -> Result<Self, AdapterError> {
        let mut adapter = Self::new()?;
        for participant in &agents.participants {
            let Ok(agent) = participant.name.parse::<AgentId>() else {
                continue;
            };
            let endpoint = Endpoint::resolve(participant, agents);
            debug!("Agent '{}' -> {:?}", agent, endpoint);
            adapter.endpoints.insert(agent, endpoint);
        }
        Ok(adapter)
    }

    pub fn with_endpoint(mut self, agent: AgentId, endpoint: Endpoint) -> Self {
        self.endpoints.insert(agent, endpoint);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self, agent: &AgentId) -> Option<&Endpoint> {
        self.endpoints.get(agent)
    }

    async fn complete_once(
        &self,
        endpoint: &Endpoint,
        request: &ModelRequest,
        system_prompt: &str,
    ) -> Result<String, AdapterError> {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &endpoint.model,
            messages,
            max_tokens: endpoint.max_tokens,
            temperature: endpoint.temperature,
        };

        let mut http = self
            .client
            .post(endpoint.completions_url())
            .timeout(request.timeout)
            .json(&body);
        if let Some(key) = &endpoint.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| map_transport(e, request))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdapterError::InvalidResponse("No content in response".to_string()))
    }
}

#[async_trait]
impl ModelAdapter for OpenAiCompatibleAdapter {
    #[instrument(skip(self, request), fields(agent = %agent, stage = %request.stage))]
    async fn invoke(&self, agent: &AgentId, request: &ModelRequest) -> Result<String, AdapterError> {
        let endpoint = self
            .endpoints
            .get(agent)
            .ok_or_else(|| AdapterError::UnknownAgent(agent.clone()))?;

        let system_prompt = match request.format {
            ResponseFormat::Prose => request.system_prompt.clone(),
            ResponseFormat::Structured if request.system_prompt.is_empty() => {
                STRUCTURED_HINT.to_string()
            }
            ResponseFormat::Structured => format!("{}\n\n{}", request.system_prompt, STRUCTURED_HINT),
        };

        debug!("Sending request to {}", endpoint.base_url);
        let label = format!("{} ({})", agent, request.stage);
        self.retry
            .run(&label, || self.complete_once(endpoint, request, &system_prompt))
            .await
    }
}
