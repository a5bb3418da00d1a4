use super::{ArchiveFormat, classify_io, io_error};
use crate::error::{ExtractionError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decompress a single `.xz` or `.gz` file into `dest_dir`
///
/// The output keeps the file name minus its compression suffix
/// (`disk.raw.xz` becomes `disk.raw`). On failure the partial output is removed
/// so a corrupt file never sits next to a good archive.
pub fn decompress_file(archive_path: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<PathBuf> {
    let output_name = archive_path
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| ExtractionError::Unsupported {
            archive: archive_path.to_path_buf(),
        })?;
    let output = dest_dir.join(output_name);

    debug!(?archive_path, ?format, ?output, "decompressing file");

    let file = File::open(archive_path).map_err(|e| io_error(archive_path, e))?;
    let reader = BufReader::new(file);
    let mut decoder: Box<dyn Read> = match format {
        ArchiveFormat::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        ArchiveFormat::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        _ => {
            return Err(ExtractionError::Unsupported {
                archive: archive_path.to_path_buf(),
            }
            .into());
        }
    };

    std::fs::create_dir_all(dest_dir).map_err(|e| io_error(archive_path, e))?;
    let out_file = File::create(&output).map_err(|e| io_error(archive_path, e))?;
    let mut writer = BufWriter::new(out_file);

    let copied = std::io::copy(&mut decoder, &mut writer).and_then(|_| writer.flush());
    if let Err(e) = copied {
        drop(writer);
        let _ = std::fs::remove_file(&output);
        return Err(classify_io(archive_path, e));
    }

    Ok(output)
}
