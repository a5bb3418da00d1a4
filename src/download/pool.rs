//! Worker pool: a fixed set of workers draining one shared queue

use super::ArtifactFetcher;
use crate::error::{Error, TransportError};
use crate::types::{ArtifactTask, DownloadResult, Event, TaskStatus};
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed-size pool of download workers
///
/// The pool owns no tasks between runs; every call to [`WorkerPool::run`]
/// seeds a fresh queue and joins all of its workers before returning.
#[derive(Clone)]
pub struct WorkerPool {
    fetcher: Arc<dyn ArtifactFetcher>,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
    progress_interval: Duration,
}

/// State shared by all workers of one run
struct RunState {
    queue: Mutex<VecDeque<ArtifactTask>>,
    results: Mutex<Vec<DownloadResult>>,
}

impl WorkerPool {
    /// Create a pool around `fetcher`
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        event_tx: broadcast::Sender<Event>,
        cancel_token: CancellationToken,
        progress_interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            event_tx,
            cancel_token,
            progress_interval,
        }
    }

    /// Download every task with `concurrency` workers
    ///
    /// Returns exactly one result per task, each with a terminal status. Result
    /// order follows completion, not input order. A `concurrency` of 0 is
    /// treated as 1; workers beyond the number of tasks exit immediately.
    pub async fn run(&self, tasks: Vec<ArtifactTask>, concurrency: usize) -> Vec<DownloadResult> {
        let total = tasks.len();
        let concurrency = concurrency.max(1);

        let state = Arc::new(RunState {
            queue: Mutex::new(tasks.into()),
            results: Mutex::new(Vec::with_capacity(total)),
        });

        info!(tasks = total, workers = concurrency, "starting download workers");

        let handles: Vec<_> = (0..concurrency)
            .map(|worker| {
                let pool = self.clone();
                let state = Arc::clone(&state);
                tokio::spawn(async move { pool.worker_loop(worker, state).await })
            })
            .collect();

        for (worker, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                warn!(worker, error = %e, "download worker terminated abnormally");
            }
        }

        // Only reachable after cancellation: nobody is left to claim these
        let mut results = std::mem::take(&mut *state.results.lock().await);
        let leftover = std::mem::take(&mut *state.queue.lock().await);
        for task in leftover {
            let url = task.url.to_string();
            results.push(DownloadResult::failed(
                task,
                0,
                TransportError::Cancelled { url }.into(),
            ));
        }

        debug!(results = results.len(), "all download workers finished");
        results
    }

    async fn worker_loop(&self, worker: usize, state: Arc<RunState>) {
        loop {
            if self.cancel_token.is_cancelled() {
                debug!(worker, "cancellation requested, worker stopping");
                break;
            }

            let claimed = {
                let mut queue = state.queue.lock().await;
                queue.pop_front()
            };
            let Some(mut task) = claimed else {
                debug!(worker, "queue drained, worker exiting");
                break;
            };

            task.status = TaskStatus::InProgress;
            let result = self.process(worker, task).await;
            state.results.lock().await.push(result);
        }
    }

    async fn process(&self, worker: usize, task: ArtifactTask) -> DownloadResult {
        let url = task.url.to_string();
        info!(worker, url = %url, destination = ?task.destination, "starting download");
        let _ = self.event_tx.send(Event::Started {
            worker,
            url: url.clone(),
        });

        let mut written: u64 = 0;
        let outcome = {
            let event_tx = self.event_tx.clone();
            let interval = self.progress_interval;
            let mut last_emit: Option<Instant> = None;
            let mut on_progress = |bytes: u64, total: Option<u64>| {
                written = bytes;
                if last_emit.is_none_or(|t| t.elapsed() >= interval) {
                    last_emit = Some(Instant::now());
                    let _ = event_tx.send(Event::Progress {
                        url: url.clone(),
                        bytes,
                        total,
                    });
                }
            };

            let fetch = AssertUnwindSafe(self.fetcher.fetch(
                &task.url,
                &task.destination,
                &mut on_progress,
            ))
            .catch_unwind();

            tokio::select! {
                res = fetch => res.unwrap_or_else(|_| Err(Error::Other(format!("download worker panicked while fetching {}", url)))),
                _ = self.cancel_token.cancelled() => Err(TransportError::Cancelled { url: url.clone() }.into()),
            }
        };

        match outcome {
            Ok(bytes) => {
                info!(worker, url = %url, bytes, "download complete");
                let _ = self.event_tx.send(Event::Downloaded {
                    url: url.clone(),
                    bytes,
                });
                DownloadResult::done(task, bytes)
            }
            Err(e) => {
                // Partial file stays on disk for inspection
                warn!(
                    worker,
                    url = %url,
                    bytes_written = written,
                    error = %e,
                    "download failed"
                );
                let _ = self.event_tx.send(Event::DownloadFailed {
                    url: url.clone(),
                    error: e.to_string(),
                });
                DownloadResult::failed(task, written, e)
            }
        }
    }
}
