//! In-memory test doubles shared by the use case tests.

use crate::ports::event_sink::DebateEventSink;
use crate::ports::model_adapter::{AdapterError, ModelAdapter, ModelRequest};
use async_trait::async_trait;
use debate_domain::{AgentId, DebateEvent, Stage};
use std::sync::Mutex;
use std::time::Duration;

type Script = Box<dyn Fn(&AgentId, &ModelRequest) -> Result<String, AdapterError> + Send + Sync>;

/// Adapter answering from a closure, recording every call
pub(crate) struct ScriptedAdapter {
    script: Script,
    calls: Mutex<Vec<(AgentId, Stage, String)>>,
    delays: Vec<(AgentId, Duration)>,
}

impl ScriptedAdapter {
    pub(crate) fn new(
        script: impl Fn(&AgentId, &ModelRequest) -> Result<String, AdapterError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            delays: Vec::new(),
        }
    }

    /// Make every call to `agent` sleep before answering
    pub(crate) fn with_delay(mut self, agent: &str, delay: Duration) -> Self {
        self.delays.push((AgentId::new(agent), delay));
        self
    }

    /// Answer from the script without recording a call
    pub(crate) fn answer(&self, agent: &AgentId, request: &ModelRequest) -> Result<String, AdapterError> {
        (self.script)(agent, request)
    }

    pub(crate) fn calls(&self) -> Vec<(AgentId, Stage, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, stage: Stage) -> usize {
        self.calls().iter().filter(|(_, s, _)| *s == stage).count()
    }

    pub(crate) fn prompts(&self, stage: Stage) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, s, _)| *s == stage)
            .map(|(_, _, p)| p)
            .collect()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    async fn invoke(&self, agent: &AgentId, request: &ModelRequest) -> Result<String, AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push((agent.clone(), request.stage, request.prompt.clone()));
        if let Some((_, delay)) = self.delays.iter().find(|(a, _)| a == agent) {
            tokio::time::sleep(*delay).await;
        }
        (self.script)(agent, request)
    }
}

/// Sink collecting every event
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<DebateEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<DebateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name()).collect()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl DebateEventSink for RecordingSink {
    fn emit(&self, event: &DebateEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// JSON factor list as a model would return it
pub(crate) fn factor_json(factors: &[(&str, f64)]) -> String {
    let items: Vec<String> = factors
        .iter()
        .map(|(name, confidence)| {
            format!(
                r#"{{"factor_name": "{}", "justification": "{} matters.", "confidence": {}}}"#,
                name, name, confidence
            )
        })
        .collect();
    format!("[{}]", items.join(", "))
}

pub(crate) fn failure(message: &str) -> AdapterError {
    AdapterError::Connection(message.to_string())
}
