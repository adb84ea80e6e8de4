//! Terminal spinner shown while the model is generating

use super::{LoggingHandler, ProgressEvent, ProgressHandler};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Shows a spinner on stderr between `InsightStarted` and the end of the
/// insight stage. All events are also passed to a [`LoggingHandler`].
#[derive(Default)]
pub struct SpinnerHandler {
    bar: Mutex<Option<ProgressBar>>,
    inner: LoggingHandler,
}

impl SpinnerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&self, model: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Waiting for {} analysis", model));
        bar.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self.slot().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn stop(&self) {
        if let Some(bar) = self.slot().take() {
            bar.finish_and_clear();
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressHandler for SpinnerHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::InsightStarted { model } => self.start(model),
            ProgressEvent::InsightComplete { .. }
            | ProgressEvent::InsightSkipped { .. }
            | ProgressEvent::Failed { .. } => self.stop(),
            _ => {}
        }
        self.inner.on_progress(event);
    }
}

impl Drop for SpinnerHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_lifecycle() {
        let handler = SpinnerHandler::new();

        handler.on_progress(&ProgressEvent::InsightStarted {
            model: "llama3".to_string(),
        });
        assert!(handler.slot().is_some());

        handler.on_progress(&ProgressEvent::InsightComplete {
            model: "llama3".to_string(),
            chars: 10,
            duration: Duration::from_millis(5),
        });
        assert!(handler.slot().is_none());
    }

    #[test]
    fn test_failure_clears_spinner() {
        let handler = SpinnerHandler::new();
        handler.on_progress(&ProgressEvent::InsightStarted {
            model: "llama3".to_string(),
        });
        handler.on_progress(&ProgressEvent::Failed {
            error: "boom".to_string(),
        });
        assert!(handler.slot().is_none());
    }
}
