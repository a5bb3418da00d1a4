//! # fedora-artifacts
//!
//! Concurrent acquisition of Fedora release artifacts: container images and
//! checksum manifests are resolved from a release identifier, downloaded by a
//! bounded worker pool and extracted next to where they landed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fedora_artifacts::{Config, PipelineContext, ReleaseSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         output_dir: "./fedora-40".into(),
//!         workers: 4,
//!         ..Default::default()
//!     };
//!     let spec = ReleaseSpec::new("40", true, false)?;
//!
//!     let ctx = PipelineContext::new(config)?;
//!     let mut events = ctx.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = ctx.acquire(&spec).await?;
//!     for failure in &report.failed {
//!         eprintln!("{}: {}", failure.task.url, failure.error);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Download worker pool and HTTP fetcher
pub mod download;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Pipeline coordinator
pub mod pipeline;
/// Release identifiers and channels
pub mod release;
/// URL resolution
pub mod resolver;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use download::{ArtifactFetcher, HttpFetcher, WorkerPool};
pub use error::{Error, ExtractionError, Result, TransportError};
pub use extraction::{ArchiveFormat, Extractor};
pub use pipeline::{PipelineContext, acquire};
pub use release::{Channel, ReleaseSpec};
pub use resolver::resolve;
pub use types::{
    ArtifactKind, ArtifactTask, DownloadResult, Event, ExtractionOutcome, ExtractionStatus,
    Failure, PipelineReport, Stage, TaskStatus,
};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when SIGINT/SIGTERM (or Ctrl+C on other platforms) arrives.
///
/// Spawns a background task and returns immediately. Downloads stop at the next
/// chunk boundary; unclaimed tasks are reported as cancelled.
///
/// # Example
///
/// ```no_run
/// use fedora_artifacts::{Config, PipelineContext, ReleaseSpec, cancel_on_signal};
///
/// # async fn example() -> fedora_artifacts::Result<()> {
/// let ctx = PipelineContext::new(Config::default())?;
/// cancel_on_signal(ctx.cancel_token());
/// let report = ctx.acquire(&ReleaseSpec::new("rawhide", false, false)?).await?;
/// # Ok(())
/// # }
/// ```
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::warn!("cancelling downloads");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
