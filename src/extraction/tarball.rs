use super::{ArchiveFormat, classify_io, io_error};
use crate::error::{ExtractionError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read buffer in front of archive files
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Decompression layer under the tar reader
enum TarCompression<R: Read> {
    Plain(R),
    Xz(xz2::read::XzDecoder<R>),
    Gzip(flate2::read::GzDecoder<R>),
}

impl<R: Read> TarCompression<R> {
    fn new(format: ArchiveFormat, reader: R) -> Option<Self> {
        match format {
            ArchiveFormat::Tar => Some(Self::Plain(reader)),
            ArchiveFormat::TarXz => Some(Self::Xz(xz2::read::XzDecoder::new(reader))),
            ArchiveFormat::TarGz => Some(Self::Gzip(flate2::read::GzDecoder::new(reader))),
            _ => None,
        }
    }
}

impl<R: Read> Read for TarCompression<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::Xz(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
        }
    }
}

/// Extract a (possibly compressed) tarball into `dest_dir`
///
/// Entries are streamed straight out of the decoder, so no intermediate `.tar`
/// is written. Existing files are overwritten. Entries that would escape
/// `dest_dir` are skipped.
pub fn extract_tarball(
    archive_path: &Path,
    format: ArchiveFormat,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?format, ?dest_dir, "extracting tarball");

    let file = File::open(archive_path).map_err(|e| io_error(archive_path, e))?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let decoder = TarCompression::new(format, reader).ok_or_else(|| ExtractionError::Unsupported {
        archive: archive_path.to_path_buf(),
    })?;

    std::fs::create_dir_all(dest_dir).map_err(|e| io_error(archive_path, e))?;

    let mut archive = tar::Archive::new(decoder);
    archive.set_overwrite(true);
    archive.set_preserve_permissions(false);

    let mut extracted = Vec::new();
    let entries = archive
        .entries()
        .map_err(|e| classify_io(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| classify_io(archive_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| classify_io(archive_path, e))?
            .into_owned();
        let is_dir = entry.header().entry_type().is_dir();

        if entry
            .unpack_in(dest_dir)
            .map_err(|e| classify_io(archive_path, e))?
        {
            // Directories are created but not reported, matching the zip path
            if !is_dir {
                extracted.push(dest_dir.join(&entry_path));
            }
        } else {
            warn!(?archive_path, ?entry_path, "skipping entry with unsafe path");
        }
    }

    debug!(
        ?archive_path,
        extracted_count = extracted.len(),
        "tarball extraction successful"
    );

    Ok(extracted)
}
