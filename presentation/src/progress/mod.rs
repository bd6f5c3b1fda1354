//! Progress rendering of debate events

pub mod reporter;
