//! The task trace log (§4.A): an ordered, in-memory record of one task's
//! reasoning/action/result steps, discarded at task end.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// One step recorded by the cognitive loop.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub reasoning: String,
    pub action: String,
    pub result: String,
}

/// Scoped to a single task. Not safe for concurrent writers; only the
/// cognitive loop mutates it.
#[derive(Debug, Default)]
pub struct TraceLog {
    entries: Vec<TraceEntry>,
}

impl TraceLog {
    pub fn new() -> Self {
        TraceLog::default()
    }

    /// Discard all entries, starting a fresh task.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Record one step with a monotonic timestamp, emitting a `tracing`
    /// event so the trace is observable in process logs independent of any
    /// final summary the caller prints.
    pub fn append(&mut self, reasoning: impl Into<String>, action: impl Into<String>, result: impl Into<String>) {
        let entry = TraceEntry {
            timestamp: Utc::now(),
            reasoning: reasoning.into(),
            action: action.into(),
            result: result.into(),
        };
        info!(
            reasoning = %entry.reasoning,
            action = %entry.action,
            result = %entry.result,
            "trace entry appended"
        );
        self.entries.push(entry);
    }

    /// The ordered entries recorded so far, for template rendering.
    pub fn snapshot(&self) -> &[TraceEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut trace = TraceLog::new();
        trace.append("r1", "a1", "res1");
        trace.append("r2", "a2", "res2");

        let snapshot = trace.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].action, "a1");
        assert_eq!(snapshot[1].action, "a2");
    }

    #[test]
    fn reset_discards_entries() {
        let mut trace = TraceLog::new();
        trace.append("r", "a", "res");
        trace.reset();
        assert!(trace.snapshot().is_empty());
    }
}
