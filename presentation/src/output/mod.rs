//! Output formatting for finished sessions

pub mod console;
pub mod formatter;
