//! Debate event sink port
//!
//! The orchestrator writes every stage completion to a sink. It has no
//! knowledge of how events are delivered (terminal, JSONL file, socket).

use debate_domain::DebateEvent;

/// Receiver of debate progress events
///
/// Implementations live in the presentation and infrastructure layers.
pub trait DebateEventSink: Send + Sync {
    fn emit(&self, event: &DebateEvent);
}

/// No-op sink for when progress reporting is not needed
pub struct NoEventSink;

impl DebateEventSink for NoEventSink {
    fn emit(&self, _event: &DebateEvent) {}
}

/// Forwards each event to several sinks, in order
#[derive(Default)]
pub struct EventFanout<'a> {
    sinks: Vec<&'a dyn DebateEventSink>,
}

impl<'a> EventFanout<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: &'a dyn DebateEventSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl DebateEventSink for EventFanout<'_> {
    fn emit(&self, event: &DebateEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Names(Mutex<Vec<&'static str>>);

    impl DebateEventSink for Names {
        fn emit(&self, event: &DebateEvent) {
            self.0.lock().unwrap().push(event.name());
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Names::default();
        let b = Names::default();
        let fanout = EventFanout::new().with(&a).with(&b);
        fanout.emit(&DebateEvent::Complete);
        assert_eq!(*a.0.lock().unwrap(), vec!["complete"]);
        assert_eq!(*b.0.lock().unwrap(), vec!["complete"]);
    }
}
