//! Prompt templates for participant, moderator and judge calls.

mod template;

pub use template::PromptTemplate;
