//! Model adapters
//!
//! - [`OpenAiCompatibleAdapter`] - routes each agent to its chat completion endpoint
//! - [`RetryPolicy`] - exponential backoff for transient failures

mod openai;
mod retry;

pub use openai::{Endpoint, OpenAiCompatibleAdapter};
pub use retry::RetryPolicy;
