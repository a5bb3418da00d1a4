use super::{classify_io, io_error};
use crate::error::{ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn corrupt(archive_path: &Path, reason: String) -> crate::error::Error {
    ExtractionError::Corrupt {
        archive: archive_path.to_path_buf(),
        reason,
    }
    .into()
}

/// Extract a single ZIP entry to disk, creating directories as needed
fn extract_zip_entry(
    mut file: ::zip::read::ZipFile,
    dest_path: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>> {
    let file_path = match file.enclosed_name() {
        Some(path) => dest_path.join(path),
        None => {
            warn!(?archive_path, name = file.name(), "skipping entry with unsafe path");
            return Ok(None);
        }
    };

    if file.is_dir() {
        std::fs::create_dir_all(&file_path).map_err(|e| io_error(archive_path, e))?;
        return Ok(None);
    }

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(archive_path, e))?;
    }

    // File::create truncates, so re-extraction replaces earlier output
    let mut outfile = std::fs::File::create(&file_path).map_err(|e| io_error(archive_path, e))?;
    std::io::copy(&mut file, &mut outfile).map_err(|e| classify_io(archive_path, e))?;

    Ok(Some(file_path))
}

/// Extract a ZIP archive into `dest_path`
pub fn extract_zip(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting ZIP archive");

    std::fs::create_dir_all(dest_path).map_err(|e| io_error(archive_path, e))?;

    let file = std::fs::File::open(archive_path).map_err(|e| io_error(archive_path, e))?;

    let mut archive = ::zip::ZipArchive::new(file)
        .map_err(|e| corrupt(archive_path, format!("failed to read ZIP archive: {}", e)))?;

    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| corrupt(archive_path, format!("failed to read ZIP entry: {}", e)))?;

        if let Some(file_path) = extract_zip_entry(entry, dest_path, archive_path)? {
            extracted_files.push(file_path);
        }
    }

    debug!(
        ?archive_path,
        extracted_count = extracted_files.len(),
        "ZIP extraction successful"
    );

    Ok(extracted_files)
}
