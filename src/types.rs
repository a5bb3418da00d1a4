//! Core types and events for fedora-artifacts

use crate::error::Error;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use url::Url;

/// Kind of artifact in the release catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Full base container image
    Image,
    /// Minimal base container image
    MinimalImage,
    /// CHECKSUM manifest covering the architecture's images
    Checksum,
}

impl ArtifactKind {
    /// Subdirectory of `{output_dir}/{arch}` this kind is written to
    ///
    /// Each image gets its own directory so that the `index.json` and
    /// `oci-layout` of one image never overwrite the other's.
    pub fn subdirectory(&self) -> Option<&'static str> {
        match self {
            ArtifactKind::Image => Some("base"),
            ArtifactKind::MinimalImage => Some("minimal"),
            ArtifactKind::Checksum => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Image => f.write_str("image"),
            ArtifactKind::MinimalImage => f.write_str("minimal image"),
            ArtifactKind::Checksum => f.write_str("checksum"),
        }
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Queued and waiting for a worker
    Pending,
    /// Claimed by a worker and downloading
    InProgress,
    /// Fully downloaded
    Done,
    /// Download failed; any partial file is left on disk
    Failed,
}

impl TaskStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

/// A single artifact to fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTask {
    /// Source URL
    pub url: Url,
    /// Where the artifact is written
    pub destination: PathBuf,
    /// Architecture the artifact belongs to
    pub architecture: String,
    /// What the artifact is
    pub kind: ArtifactKind,
    /// Lifecycle status, mutated only by the claiming worker
    pub status: TaskStatus,
}

impl ArtifactTask {
    /// Create a pending task
    pub fn new(url: Url, destination: PathBuf, architecture: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            url,
            destination,
            architecture: architecture.into(),
            kind,
            status: TaskStatus::Pending,
        }
    }

    /// File name of the destination, for logging
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.url.to_string())
    }
}

/// Outcome of one task, produced exactly once by the worker pool
#[derive(Debug)]
pub struct DownloadResult {
    /// The task, with a terminal status
    pub task: ArtifactTask,
    /// Bytes written to `task.destination`
    pub bytes_written: u64,
    /// Why the task failed, if it did
    pub error: Option<Error>,
}

impl DownloadResult {
    /// Build a successful result
    pub fn done(mut task: ArtifactTask, bytes_written: u64) -> Self {
        task.status = TaskStatus::Done;
        Self {
            task,
            bytes_written,
            error: None,
        }
    }

    /// Build a failed result
    pub fn failed(mut task: ArtifactTask, bytes_written: u64, error: Error) -> Self {
        task.status = TaskStatus::Failed;
        Self {
            task,
            bytes_written,
            error: Some(error),
        }
    }

    /// Whether the download finished successfully
    pub fn is_done(&self) -> bool {
        self.task.status == TaskStatus::Done
    }
}

/// Result of extraction for one downloaded file
#[derive(Debug)]
pub struct ExtractionOutcome {
    /// The downloaded file that was inspected
    pub archive: PathBuf,
    /// The task that produced the file
    pub task: ArtifactTask,
    /// What happened
    pub status: ExtractionStatus,
}

/// Per-file extraction status
#[derive(Debug)]
pub enum ExtractionStatus {
    /// Contents were expanded next to the archive
    Extracted {
        /// Paths written, joined onto the archive's directory
        files: Vec<PathBuf>,
    },
    /// Not a recognised archive; left untouched
    Skipped,
    /// Extraction failed; the archive is left in place
    Failed(Error),
}

/// Pipeline stage a failure happened in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// HTTP fetch
    Download,
    /// Archive expansion
    Extraction,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Download => f.write_str("download"),
            Stage::Extraction => f.write_str("extraction"),
        }
    }
}

/// One failed artifact in a [`PipelineReport`]
#[derive(Debug, Serialize)]
pub struct Failure {
    /// The task that failed
    pub task: ArtifactTask,
    /// Where it failed
    pub stage: Stage,
    /// Machine-readable error code
    pub code: &'static str,
    /// Why it failed
    #[serde(serialize_with = "serialize_display")]
    pub error: Error,
}

impl Failure {
    /// Record a failure at `stage`
    pub fn new(task: ArtifactTask, stage: Stage, error: Error) -> Self {
        Self {
            task,
            stage,
            code: error.error_code(),
            error,
        }
    }
}

/// Aggregated outcome of a pipeline run
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    /// Number of tasks produced by the resolver
    pub total_tasks: usize,
    /// Tasks that downloaded and, if archives, extracted cleanly
    pub succeeded: usize,
    /// Total bytes downloaded across all tasks
    pub bytes_downloaded: u64,
    /// Every individual failure
    pub failed: Vec<Failure>,
}

impl PipelineReport {
    /// True only if nothing failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn serialize_display<S: Serializer>(error: &Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Progress events broadcast while the pipeline runs
///
/// Subscribe with [`PipelineContext::subscribe`](crate::pipeline::PipelineContext::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Tasks resolved and queued
    Queued {
        /// Number of tasks queued
        total: usize,
    },

    /// A worker claimed a task
    Started {
        /// Worker index
        worker: usize,
        /// Source URL
        url: String,
    },

    /// Bytes written so far for a download
    Progress {
        /// Source URL
        url: String,
        /// Bytes written
        bytes: u64,
        /// Content-Length, if the server sent one
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },

    /// A download finished
    Downloaded {
        /// Source URL
        url: String,
        /// Bytes written
        bytes: u64,
    },

    /// A download failed
    DownloadFailed {
        /// Source URL
        url: String,
        /// Error message
        error: String,
    },

    /// Extraction of an archive started
    Extracting {
        /// Archive path
        archive: PathBuf,
    },

    /// Extraction of an archive finished
    Extracted {
        /// Archive path
        archive: PathBuf,
        /// Number of files written
        files: usize,
    },

    /// Extraction of an archive failed
    ExtractionFailed {
        /// Archive path
        archive: PathBuf,
        /// Error message
        error: String,
    },

    /// The run finished
    Finished {
        /// Tasks that succeeded
        succeeded: usize,
        /// Tasks that failed
        failed: usize,
    },
}
