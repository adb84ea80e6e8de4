use super::error::PipelineError;
use crate::fingerprint::{FingerprintResult, FingerprintSource};
use crate::insight::{build_insight_prompt, Insight, InsightBackend, InsightError};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::report::{ReportSummary, ReportWriter};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Input for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub domain: String,

    /// Write a spreadsheet here; `None` skips the export stage
    pub export_path: Option<PathBuf>,

    /// Use this text instead of asking the insight backend
    pub provided_insight: Option<Insight>,
}

impl RunRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    pub fn with_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    pub fn with_insight(mut self, insight: Insight) -> Self {
        self.provided_insight = Some(insight);
        self
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub fingerprint: FingerprintResult,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<Insight>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSummary>,

    /// Why the insight is missing, when generation failed but export went ahead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_error: Option<String>,
}

/// Drives fingerprint lookup, insight generation and report export in order
pub struct Pipeline {
    source: Arc<dyn FingerprintSource>,
    insight: Option<Arc<dyn InsightBackend>>,
    writer: ReportWriter,
    progress: Arc<dyn ProgressHandler>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn FingerprintSource>) -> Self {
        Self {
            source,
            insight: None,
            writer: ReportWriter::new(),
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_insight(mut self, backend: Arc<dyn InsightBackend>) -> Self {
        self.insight = Some(backend);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every configured stage.
    ///
    /// An insight failure ends the run, unless a spreadsheet was requested:
    /// then it is recorded in [`RunOutcome::insight_error`] and the report is
    /// written without the analysis.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, PipelineError> {
        let result = self.execute(request).await;
        if let Err(e) = &result {
            self.progress.on_progress(&ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    }

    async fn execute(&self, request: RunRequest) -> Result<RunOutcome, PipelineError> {
        let start = Instant::now();
        let domain = validate_domain(&request.domain)?;

        self.progress.on_progress(&ProgressEvent::Started {
            domain: domain.clone(),
        });

        let fingerprint = self.fingerprint(&domain).await?;

        let (insight, insight_error) = match request.provided_insight {
            Some(insight) => {
                debug!(chars = insight.text.len(), "Using provided insight text");
                (Some(insight), None)
            }
            None => match self.generate_insight(&fingerprint).await {
                Ok(insight) => (insight, None),
                Err(e) if request.export_path.is_some() => {
                    warn!(error = %e, "Insight generation failed, exporting without analysis");
                    self.progress.on_progress(&ProgressEvent::InsightSkipped {
                        reason: e.to_string(),
                    });
                    (None, Some(e.to_string()))
                }
                Err(e) => return Err(e.into()),
            },
        };

        let report = match &request.export_path {
            Some(path) => {
                let summary = self.writer.write(path, &fingerprint, insight.as_ref())?;
                self.progress.on_progress(&ProgressEvent::ReportWritten {
                    path: summary.path.clone(),
                    rows: summary.rows,
                });
                Some(summary)
            }
            None => None,
        };

        self.progress.on_progress(&ProgressEvent::Completed {
            total_time: start.elapsed(),
        });

        Ok(RunOutcome {
            fingerprint,
            insight,
            report,
            insight_error,
        })
    }

    async fn fingerprint(&self, domain: &str) -> Result<FingerprintResult, PipelineError> {
        let started = Instant::now();
        info!(domain, source = self.source.name(), "Looking up technologies");

        let fingerprint = self.source.lookup(domain).await?;

        for error in &fingerprint.errors {
            warn!(domain, error = %error, "Fingerprint service reported an error");
        }

        self.progress.on_progress(&ProgressEvent::FingerprintComplete {
            categories: fingerprint.categories.len(),
            items: fingerprint.item_count(),
            duration: started.elapsed(),
            document: Arc::new(fingerprint.raw.clone()),
        });

        Ok(fingerprint)
    }

    async fn generate_insight(
        &self,
        fingerprint: &FingerprintResult,
    ) -> Result<Option<Insight>, InsightError> {
        let Some(backend) = &self.insight else {
            debug!("No insight backend configured");
            return Ok(None);
        };

        let model = backend.model().to_string();
        if let Some(info) = backend.model_info() {
            debug!(backend = backend.name(), model = %info, "Generating insight");
        }
        self.progress.on_progress(&ProgressEvent::InsightStarted {
            model: model.clone(),
        });

        let started = Instant::now();
        let prompt = build_insight_prompt(fingerprint);
        let text = backend.generate(&prompt).await?;

        self.progress.on_progress(&ProgressEvent::InsightComplete {
            model: model.clone(),
            chars: text.chars().count(),
            duration: started.elapsed(),
        });

        Ok(Some(Insight::new(text, model)))
    }
}

fn validate_domain(domain: &str) -> Result<String, PipelineError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(PipelineError::InvalidDomain(
            "domain must not be empty".to_string(),
        ));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(PipelineError::InvalidDomain(format!(
            "'{}' contains whitespace",
            domain
        )));
    }
    Ok(domain.to_string())
}
