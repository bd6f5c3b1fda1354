//! The debate subdomain.
//!
//! - [`factor`] - factors and factor-list parsing
//! - [`response`] - agent responses and rounds
//! - [`convergence`] - comparing adjacent structured rounds
//! - [`merge`] - consensus merge and its algorithmic fallback
//! - [`judge`] - judge ratings and the accept/reject rule
//! - [`variant`] - protocol variants and their pipeline plans
//! - [`answer`] - reference baseline and final answer
//! - [`event`] - progress events
//! - [`session`] - the session aggregate written to transcripts

pub mod answer;
pub mod convergence;
pub mod event;
pub mod factor;
pub mod judge;
pub mod merge;
pub mod response;
pub mod session;
pub mod variant;
