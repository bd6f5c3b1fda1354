//! Human feedback collected on the terminal

mod interactive;

pub use interactive::InteractiveFeedback;
