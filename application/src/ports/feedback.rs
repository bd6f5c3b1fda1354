//! Human feedback port.
//!
//! Between debate rounds the loop suspends in its `AwaitingFeedback` state
//! and the orchestrator asks this port for an optional feedback string,
//! which is injected into the next round's prompts.
//!
//! # Built-in Implementations
//!
//! - [`NoFeedback`] - returns `None` immediately (non-interactive runs)
//! - [`ChannelFeedback`] - waits on a channel for a bounded time, so a
//!   session driven by another task (e.g. a web handler) never blocks forever
//!
//! For the terminal prompt, see `InteractiveFeedback` in the presentation layer.

use async_trait::async_trait;
use debate_domain::Round;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Errors while collecting feedback. Absence of feedback is not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait FeedbackPort: Send + Sync {
    /// Feedback for the round after `latest`. `None` means no feedback.
    async fn request_feedback(&self, latest: &Round) -> Result<Option<String>, FeedbackError>;
}

/// Never provides feedback and never waits
pub struct NoFeedback;

#[async_trait]
impl FeedbackPort for NoFeedback {
    async fn request_feedback(&self, _latest: &Round) -> Result<Option<String>, FeedbackError> {
        Ok(None)
    }
}

/// Feedback delivered through an mpsc channel
pub struct ChannelFeedback {
    receiver: Mutex<mpsc::Receiver<String>>,
    wait: Duration,
}

impl ChannelFeedback {
    /// Create the port and the sender used to submit feedback.
    ///
    /// Each request waits at most `wait`; a timeout or a closed channel
    /// yields `None`.
    pub fn new(wait: Duration) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                receiver: Mutex::new(rx),
                wait,
            },
            tx,
        )
    }
}

#[async_trait]
impl FeedbackPort for ChannelFeedback {
    async fn request_feedback(&self, _latest: &Round) -> Result<Option<String>, FeedbackError> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(self.wait, receiver.recv()).await {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(Some(text)),
            _ => Ok(None),
        }
    }
}
