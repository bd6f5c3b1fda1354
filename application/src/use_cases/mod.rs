//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod convergence;
pub mod debate_loop;
pub mod fan_out;
pub mod judge;
pub mod merge;
pub mod refine;
pub mod run_debate;
pub mod synthesize;
