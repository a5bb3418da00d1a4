//! Pipeline coordinator: resolve, download, extract and aggregate
//!
//! A [`PipelineContext`] owns everything a run needs: the validated config, the
//! fetcher (and with it the HTTP client), the event channel and the cancellation
//! token. Nothing is global; dropping the context tears everything down.

use crate::config::Config;
use crate::download::{ArtifactFetcher, HttpFetcher, WorkerPool};
use crate::error::{Error, Result};
use crate::extraction::Extractor;
use crate::release::ReleaseSpec;
use crate::resolver;
use crate::types::{Event, ExtractionStatus, Failure, PipelineReport, Stage};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Explicitly constructed state for one or more pipeline runs
pub struct PipelineContext {
    config: Config,
    fetcher: Arc<dyn ArtifactFetcher>,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl PipelineContext {
    /// Validate `config` and build a context with the production HTTP fetcher
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Build a context around a custom fetcher
    ///
    /// The config is not validated here; [`PipelineContext::acquire`] validates it
    /// before doing any work.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            fetcher,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// The configuration this context runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that cancels in-flight and pending downloads when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Fetch and extract every artifact of `spec`
    ///
    /// Returns `Err` only for configuration problems or when the output
    /// directory cannot be created; both happen before any network request.
    /// Download and extraction failures are collected in the report.
    pub async fn acquire(&self, spec: &ReleaseSpec) -> Result<PipelineReport> {
        self.config.validate()?;
        let tasks = resolver::resolve(spec, &self.config)?;
        let total_tasks = tasks.len();

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| {
                Error::config(
                    format!(
                        "failed to create output directory {}: {}",
                        self.config.output_dir.display(),
                        e
                    ),
                    "output_dir",
                )
            })?;

        info!(
            release = %spec,
            tasks = total_tasks,
            workers = self.config.workers,
            output_dir = ?self.config.output_dir,
            "acquiring release artifacts"
        );
        let _ = self.event_tx.send(Event::Queued { total: total_tasks });

        let pool = WorkerPool::new(
            Arc::clone(&self.fetcher),
            self.event_tx.clone(),
            self.cancel_token.clone(),
            self.config.progress_interval,
        );
        let results = pool.run(tasks, self.config.workers).await;

        let extractor = Extractor::new(self.config.keep_archives).with_events(self.event_tx.clone());
        let outcomes = extractor.extract(&results).await;

        let mut report = PipelineReport {
            total_tasks,
            bytes_downloaded: results.iter().map(|r| r.bytes_written).sum(),
            ..Default::default()
        };

        let mut downloaded = 0;
        for result in results {
            if result.is_done() {
                downloaded += 1;
                continue;
            }
            let error = result
                .error
                .unwrap_or_else(|| Error::Other("download failed without an error".to_string()));
            report
                .failed
                .push(Failure::new(result.task, Stage::Download, error));
        }

        let mut extraction_failures = 0;
        for outcome in outcomes {
            if let ExtractionStatus::Failed(error) = outcome.status {
                extraction_failures += 1;
                report
                    .failed
                    .push(Failure::new(outcome.task, Stage::Extraction, error));
            }
        }

        report.succeeded = downloaded - extraction_failures;

        for failure in &report.failed {
            error!(
                url = %failure.task.url,
                stage = %failure.stage,
                error = %failure.error,
                "artifact failed"
            );
        }
        info!(
            total = report.total_tasks,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            bytes = report.bytes_downloaded,
            "acquisition finished"
        );
        let _ = self.event_tx.send(Event::Finished {
            succeeded: report.succeeded,
            failed: report.failed.len(),
        });

        Ok(report)
    }
}

/// One-shot acquisition with default settings apart from the output directory
/// and worker count
pub async fn acquire(
    spec: &ReleaseSpec,
    output_dir: &Path,
    concurrency: usize,
) -> Result<PipelineReport> {
    let config = Config {
        output_dir: output_dir.to_path_buf(),
        workers: concurrency,
        ..Default::default()
    };
    PipelineContext::new(config)?.acquire(spec).await
}
