//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation
//! adapters must implement.

pub mod event_sink;
pub mod feedback;
pub mod model_adapter;
pub mod transcript;
