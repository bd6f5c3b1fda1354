//! Core domain concepts shared across all subdomains.
//!
//! - [`agent::AgentId`] - the name of one participating model
//! - [`question::Question`] - a validated question to put to the debate
//! - [`error::DomainError`] - domain-level errors

pub mod agent;
pub mod error;
pub mod question;
pub mod string;
