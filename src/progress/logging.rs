//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { domain } => {
                info!(domain = %domain, "Starting analysis");
            }
            ProgressEvent::FingerprintComplete {
                categories,
                items,
                duration,
                ..
            } => {
                info!(
                    categories,
                    items,
                    duration_ms = duration.as_millis(),
                    "Fingerprint lookup complete"
                );
            }
            ProgressEvent::InsightStarted { model } => {
                debug!(model = %model, "Requesting insight");
            }
            ProgressEvent::InsightComplete {
                model,
                chars,
                duration,
            } => {
                info!(
                    model = %model,
                    chars,
                    duration_ms = duration.as_millis(),
                    "Insight generated"
                );
            }
            ProgressEvent::InsightSkipped { reason } => {
                warn!(reason = %reason, "Continuing without insight");
            }
            ProgressEvent::ReportWritten { path, rows } => {
                info!(path = %path.display(), rows, "Report saved");
            }
            ProgressEvent::Completed { total_time } => {
                info!(total_time_ms = total_time.as_millis(), "Analysis complete");
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Analysis failed");
            }
        }
    }
}
