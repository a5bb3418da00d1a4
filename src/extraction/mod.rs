//! Archive extraction
//!
//! Runs after every download has finished. Each `Done` result whose file name
//! carries a recognised archive suffix is expanded into the directory holding
//! the archive; everything else passes through untouched. A failure on one
//! archive is recorded and the remaining archives are still processed.

mod compressed;
mod tarball;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use compressed::decompress_file;
pub use tarball::extract_tarball;
pub use self::zip::extract_zip;

use crate::error::{Error, ExtractionError, Result};
use crate::types::{DownloadResult, Event, ExtractionOutcome, ExtractionStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Archive formats the extraction stage understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// xz-compressed tarball (`.tar.xz`, `.txz`)
    TarXz,
    /// gzip-compressed tarball (`.tar.gz`, `.tgz`)
    TarGz,
    /// Uncompressed tarball (`.tar`)
    Tar,
    /// ZIP archive (`.zip`)
    Zip,
    /// Single xz-compressed file (`.xz`)
    Xz,
    /// Single gzip-compressed file (`.gz`)
    Gzip,
}

/// Detect archive format from the file name
///
/// Multi-part suffixes are checked before single ones, so `image.tar.xz` is a
/// tarball while `disk.raw.xz` is a single compressed file.
pub fn detect_archive_format(path: &Path) -> Option<ArchiveFormat> {
    let name = path.file_name()?.to_str()?.to_lowercase();

    const SUFFIXES: &[(&str, ArchiveFormat)] = &[
        (".tar.xz", ArchiveFormat::TarXz),
        (".txz", ArchiveFormat::TarXz),
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar", ArchiveFormat::Tar),
        (".zip", ArchiveFormat::Zip),
        (".xz", ArchiveFormat::Xz),
        (".gz", ArchiveFormat::Gzip),
    ];

    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix) && name.len() > suffix.len())
        .map(|(_, format)| *format)
}

/// Expand `archive` into `dest_dir`, returning the paths written
///
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn extract_archive(archive: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    if !archive.is_file() {
        return Err(ExtractionError::Missing {
            archive: archive.to_path_buf(),
        }
        .into());
    }

    match format {
        ArchiveFormat::TarXz | ArchiveFormat::TarGz | ArchiveFormat::Tar => {
            extract_tarball(archive, format, dest_dir)
        }
        ArchiveFormat::Zip => extract_zip(archive, dest_dir),
        ArchiveFormat::Xz | ArchiveFormat::Gzip => {
            decompress_file(archive, format, dest_dir).map(|file| vec![file])
        }
    }
}

/// Post-download extraction stage
#[derive(Clone, Debug)]
pub struct Extractor {
    keep_archives: bool,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl Extractor {
    /// Create an extractor; with `keep_archives` unset, archives are deleted after
    /// a successful extraction
    pub fn new(keep_archives: bool) -> Self {
        Self {
            keep_archives,
            event_tx: None,
        }
    }

    /// Broadcast extraction events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Extract every finished download that is an archive
    ///
    /// Returns one outcome per `Done` result; failed downloads are not inspected.
    pub async fn extract(&self, results: &[DownloadResult]) -> Vec<ExtractionOutcome> {
        let mut outcomes = Vec::new();

        for result in results.iter().filter(|r| r.is_done()) {
            let archive = result.task.destination.clone();
            let status = match detect_archive_format(&archive) {
                None => {
                    debug!(?archive, "not an archive, leaving as is");
                    ExtractionStatus::Skipped
                }
                Some(format) => self.extract_one(&archive, format).await,
            };
            outcomes.push(ExtractionOutcome {
                archive,
                task: result.task.clone(),
                status,
            });
        }

        outcomes
    }

    async fn extract_one(&self, archive: &Path, format: ArchiveFormat) -> ExtractionStatus {
        let dest_dir = archive
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(?archive, ?format, ?dest_dir, "extracting archive");
        self.emit(Event::Extracting {
            archive: archive.to_path_buf(),
        });

        let archive_owned = archive.to_path_buf();
        let result = spawn_blocking(move || extract_archive(&archive_owned, format, &dest_dir))
            .await
            .unwrap_or_else(|e| {
                Err(Error::Other(format!(
                    "extraction task panicked for {}: {}",
                    archive.display(),
                    e
                )))
            });

        match result {
            Ok(files) => {
                info!(?archive, files = files.len(), "extraction complete");
                self.emit(Event::Extracted {
                    archive: archive.to_path_buf(),
                    files: files.len(),
                });
                if !self.keep_archives {
                    self.remove_archive(archive).await;
                }
                ExtractionStatus::Extracted { files }
            }
            Err(e) => {
                warn!(?archive, error = %e, "extraction failed, archive left in place");
                self.emit(Event::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    error: e.to_string(),
                });
                ExtractionStatus::Failed(e)
            }
        }
    }

    async fn remove_archive(&self, archive: &Path) {
        match tokio::fs::remove_file(archive).await {
            Ok(()) => debug!(?archive, "removed archive after extraction"),
            Err(e) => warn!(?archive, error = %e, "failed to remove archive after extraction"),
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// Map an I/O error hit while extracting `archive`
///
/// Filesystem-side failures stay I/O errors; anything else means the archive
/// stream itself could not be decoded.
pub(crate) fn classify_io(archive: &Path, err: std::io::Error) -> Error {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::PermissionDenied
        | ErrorKind::NotFound
        | ErrorKind::AlreadyExists
        | ErrorKind::WriteZero
        | ErrorKind::StorageFull
        | ErrorKind::ReadOnlyFilesystem
        | ErrorKind::QuotaExceeded
        | ErrorKind::FileTooLarge => ExtractionError::Io {
            archive: archive.to_path_buf(),
            source: err,
        }
        .into(),
        _ => ExtractionError::Corrupt {
            archive: archive.to_path_buf(),
            reason: err.to_string(),
        }
        .into(),
    }
}

/// Map a failure to open or create a file while extracting `archive`
pub(crate) fn io_error(archive: &Path, err: std::io::Error) -> Error {
    ExtractionError::Io {
        archive: archive.to_path_buf(),
        source: err,
    }
    .into()
}
