//! Terminal echo of selected progress events

use super::{ProgressEvent, ProgressHandler};
use crate::insight::ChunkSink;
use std::sync::Arc;

/// Writes the raw fingerprint document and the streaming banner to a sink as
/// the matching events arrive, then forwards every event to `inner`.
pub struct ConsoleHandler {
    inner: Arc<dyn ProgressHandler>,
    sink: ChunkSink,
    show_document: bool,
    announce_insight: bool,
}

impl ConsoleHandler {
    pub fn new(inner: Arc<dyn ProgressHandler>, sink: ChunkSink) -> Self {
        Self {
            inner,
            sink,
            show_document: false,
            announce_insight: false,
        }
    }

    /// Print the response document once the lookup completes
    pub fn with_document(mut self, enabled: bool) -> Self {
        self.show_document = enabled;
        self
    }

    /// Print a banner before the model starts answering
    pub fn with_insight_banner(mut self, enabled: bool) -> Self {
        self.announce_insight = enabled;
        self
    }
}

impl ProgressHandler for ConsoleHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::FingerprintComplete { document, .. } if self.show_document => {
                let text = serde_json::to_string_pretty(document.as_ref())
                    .unwrap_or_else(|_| document.to_string());
                (self.sink)(&format!("{}\n", text));
            }
            ProgressEvent::InsightStarted { model } if self.announce_insight => {
                (self.sink)(&format!("Analyzing with Ollama ({})...\n\n", model));
            }
            _ => {}
        }
        self.inner.on_progress(event);
    }
}
