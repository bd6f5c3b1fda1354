//! Model adapter port
//!
//! Defines the interface for invoking one participating model. The debate
//! core never sees provider details: endpoints, authentication, wire
//! formats and retry policy all live behind this trait.

use async_trait::async_trait;
use debate_domain::{AgentId, Stage};
use std::time::Duration;
use thiserror::Error;

/// Expected shape of the model's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Prose,
    /// JSON array or object embedded in the text
    Structured,
}

/// One model call
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub stage: Stage,
    pub system_prompt: String,
    pub prompt: String,
    pub format: ResponseFormat,
    /// Upper bound for the whole call, including adapter retries
    pub timeout: Duration,
}

impl ModelRequest {
    pub fn prose(stage: Stage, system_prompt: &str, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            stage,
            system_prompt: system_prompt.to_string(),
            prompt: prompt.into(),
            format: ResponseFormat::Prose,
            timeout,
        }
    }

    pub fn structured(
        stage: Stage,
        system_prompt: &str,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            format: ResponseFormat::Structured,
            ..Self::prose(stage, system_prompt, prompt, timeout)
        }
    }
}

/// Classification of an adapter failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Connection,
    Provider,
    RateLimited,
    Timeout,
    UnknownAgent,
    InvalidResponse,
    Other,
}

/// Errors that can occur during a model call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("No endpoint configured for agent {0}")]
    UnknownAgent(AgentId),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl AdapterError {
    pub fn kind(&self) -> AdapterErrorKind {
        match self {
            AdapterError::Connection(_) => AdapterErrorKind::Connection,
            AdapterError::Provider { .. } => AdapterErrorKind::Provider,
            AdapterError::RateLimited(_) => AdapterErrorKind::RateLimited,
            AdapterError::Timeout(_) => AdapterErrorKind::Timeout,
            AdapterError::UnknownAgent(_) => AdapterErrorKind::UnknownAgent,
            AdapterError::InvalidResponse(_) => AdapterErrorKind::InvalidResponse,
            AdapterError::Other(_) => AdapterErrorKind::Other,
        }
    }

    /// Whether a retry at the adapter boundary may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Connection(_) | AdapterError::RateLimited(_) => true,
            AdapterError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Uniform access to every participating model
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Send one request to the model behind `agent` and return its text
    async fn invoke(&self, agent: &AgentId, request: &ModelRequest) -> Result<String, AdapterError>;
}
