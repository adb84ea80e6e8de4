//! Progress handler trait and events

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Events emitted while a pipeline run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { domain: String },

    /// Fingerprint lookup returned
    FingerprintComplete {
        categories: usize,
        items: usize,
        duration: Duration,
        /// Response document as received
        document: Arc<Value>,
    },

    /// Insight request sent to the model
    InsightStarted { model: String },

    /// Insight text received
    InsightComplete {
        model: String,
        chars: usize,
        duration: Duration,
    },

    /// Insight stage did not produce text but the run continues
    InsightSkipped { reason: String },

    /// Spreadsheet saved
    ReportWritten { path: PathBuf, rows: usize },

    /// Run completed successfully
    Completed { total_time: Duration },

    /// Run failed
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::Started {
            domain: "example.com".to_string(),
        });
        handler.on_progress(&ProgressEvent::FingerprintComplete {
            categories: 2,
            items: 2,
            duration: Duration::from_millis(50),
            document: Arc::new(Value::Null),
        });
        handler.on_progress(&ProgressEvent::Completed {
            total_time: Duration::from_secs(5),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::InsightStarted {
            model: "llama3".to_string(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("InsightStarted"));
        assert!(debug_str.contains("llama3"));
    }
}
