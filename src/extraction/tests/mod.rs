use crate::error::{Error, ExtractionError, TransportError};
use crate::extraction::*;
use crate::types::{
    ArtifactKind, ArtifactTask, DownloadResult, Event, ExtractionOutcome, ExtractionStatus,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build an uncompressed tar holding `files` in memory
fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

fn create_tar_xz(path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = xz2::write::XzEncoder::new(file, 6);
    encoder.write_all(&tar_bytes(files)).unwrap();
    encoder.finish().unwrap();
}

fn create_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(&tar_bytes(files)).unwrap();
    encoder.finish().unwrap();
}

/// Create a valid ZIP archive containing multiple files
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

fn done_result(path: PathBuf) -> DownloadResult {
    let url = url::Url::parse("http://mirror.invalid/artifact").unwrap();
    DownloadResult::done(ArtifactTask::new(url, path, "x86_64", ArtifactKind::Image), 0)
}

fn oci_layout() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("oci-layout", br#"{"imageLayoutVersion":"1.0.0"}"#),
        ("index.json", br#"{"manifests":[]}"#),
        ("blobs/sha256/abc", b"layer bytes"),
    ]
}

fn status_of(outcome: &ExtractionOutcome) -> &ExtractionStatus {
    &outcome.status
}

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

#[test]
fn test_detect_archive_format() {
    let cases = [
        ("Fedora-Container-Base-Generic-40.x86_64.oci.tar.xz", Some(ArchiveFormat::TarXz)),
        ("image.TXZ", Some(ArchiveFormat::TarXz)),
        ("tree.tar.gz", Some(ArchiveFormat::TarGz)),
        ("tree.tgz", Some(ArchiveFormat::TarGz)),
        ("plain.tar", Some(ArchiveFormat::Tar)),
        ("bundle.zip", Some(ArchiveFormat::Zip)),
        ("disk.raw.xz", Some(ArchiveFormat::Xz)),
        ("notes.txt.gz", Some(ArchiveFormat::Gzip)),
        ("Fedora-Container-40-x86_64-CHECKSUM", None),
        ("image.qcow2", None),
        (".xz", None),
        ("tar", None),
    ];

    for (name, expected) in cases {
        assert_eq!(
            detect_archive_format(Path::new(name)),
            expected,
            "detection of {name}"
        );
    }
}

// ---------------------------------------------------------------------------
// Individual formats
// ---------------------------------------------------------------------------

#[test]
fn test_extract_tar_xz() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("image.oci.tar.xz");
    create_tar_xz(&archive, &oci_layout());

    let files = extract_archive(&archive, ArchiveFormat::TarXz, dir.path()).unwrap();

    assert_eq!(files.len(), 3);
    assert_eq!(
        std::fs::read(dir.path().join("blobs/sha256/abc")).unwrap(),
        b"layer bytes"
    );
    assert!(dir.path().join("index.json").is_file());
}

#[test]
fn test_extract_tar_gz() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("tree.tgz");
    create_tar_gz(&archive, &[("a/b.txt", b"hello")]);

    let files = extract_archive(&archive, ArchiveFormat::TarGz, dir.path()).unwrap();
    assert_eq!(files, vec![dir.path().join("a/b.txt")]);
    assert_eq!(std::fs::read(dir.path().join("a/b.txt")).unwrap(), b"hello");
}

#[test]
fn test_extract_plain_tar() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("plain.tar");
    std::fs::write(&archive, tar_bytes(&[("x", b"1")])).unwrap();

    let files = extract_archive(&archive, ArchiveFormat::Tar, dir.path()).unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_tar_directory_entries_are_not_counted() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("layout.tar");

    let mut builder = tar::Builder::new(Vec::new());
    let mut dir_header = tar::Header::new_gnu();
    dir_header.set_entry_type(tar::EntryType::Directory);
    dir_header.set_size(0);
    dir_header.set_mode(0o755);
    dir_header.set_cksum();
    builder
        .append_data(&mut dir_header, "blobs/", std::io::empty())
        .unwrap();
    let mut file_header = tar::Header::new_gnu();
    file_header.set_size(4);
    file_header.set_mode(0o644);
    file_header.set_cksum();
    builder
        .append_data(&mut file_header, "blobs/data", &b"blob"[..])
        .unwrap();
    std::fs::write(&archive, builder.into_inner().unwrap()).unwrap();

    let files = extract_archive(&archive, ArchiveFormat::Tar, dir.path()).unwrap();

    assert_eq!(files, vec![dir.path().join("blobs/data")]);
    assert!(dir.path().join("blobs").is_dir());
}

#[test]
fn test_extract_zip() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("bundle.zip");
    create_zip_archive(&archive, &[("one.txt", b"1"), ("sub/two.txt", b"2")]);

    let mut files = extract_archive(&archive, ArchiveFormat::Zip, dir.path()).unwrap();
    files.sort();
    assert_eq!(
        files,
        vec![dir.path().join("one.txt"), dir.path().join("sub/two.txt")]
    );
}

#[test]
fn test_decompress_single_xz_file() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("disk.raw.xz");
    {
        let file = std::fs::File::create(&archive).unwrap();
        let mut encoder = xz2::write::XzEncoder::new(file, 6);
        encoder.write_all(b"raw disk image").unwrap();
        encoder.finish().unwrap();
    }

    let files = extract_archive(&archive, ArchiveFormat::Xz, dir.path()).unwrap();
    assert_eq!(files, vec![dir.path().join("disk.raw")]);
    assert_eq!(std::fs::read(dir.path().join("disk.raw")).unwrap(), b"raw disk image");
}

#[test]
fn test_corrupt_tar_xz_is_corrupt_error() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.tar.xz");
    std::fs::write(&archive, b"this is not xz data at all").unwrap();

    let err = extract_archive(&archive, ArchiveFormat::TarXz, dir.path()).unwrap_err();
    assert!(
        matches!(err, Error::Extraction(ExtractionError::Corrupt { .. })),
        "got {err:?}"
    );
}

#[test]
fn test_corrupt_zip_is_corrupt_error() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.zip");
    std::fs::write(&archive, b"PK garbage").unwrap();

    let err = extract_archive(&archive, ArchiveFormat::Zip, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Corrupt { .. })
    ));
}

#[test]
fn test_corrupt_single_xz_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("disk.raw.xz");
    std::fs::write(&archive, b"garbage").unwrap();

    assert!(extract_archive(&archive, ArchiveFormat::Xz, dir.path()).is_err());
    assert!(!dir.path().join("disk.raw").exists());
}

#[test]
fn test_missing_archive() {
    let dir = TempDir::new().unwrap();
    let err = extract_archive(&dir.path().join("gone.tar"), ArchiveFormat::Tar, dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Missing { .. })
    ));
}

#[test]
fn test_reextraction_overwrites_deterministically() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("image.tar.xz");
    create_tar_xz(&archive, &oci_layout());

    extract_archive(&archive, ArchiveFormat::TarXz, dir.path()).unwrap();
    // Local edits to extracted files are replaced by archive content
    std::fs::write(dir.path().join("index.json"), b"tampered and much longer than before").unwrap();

    let second = extract_archive(&archive, ArchiveFormat::TarXz, dir.path()).unwrap();

    assert_eq!(second.len(), 3);
    assert_eq!(
        std::fs::read(dir.path().join("index.json")).unwrap(),
        br#"{"manifests":[]}"#
    );
    assert_eq!(
        std::fs::read(dir.path().join("blobs/sha256/abc")).unwrap(),
        b"layer bytes"
    );
}

// ---------------------------------------------------------------------------
// Extractor stage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_extractor_removes_archive_by_default() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("image.tar.xz");
    create_tar_xz(&archive, &[("payload", b"data")]);

    let outcomes = Extractor::new(false)
        .extract(&[done_result(archive.clone())])
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        status_of(&outcomes[0]),
        ExtractionStatus::Extracted { files } if files.len() == 1
    ));
    assert!(!archive.exists());
    assert!(dir.path().join("payload").is_file());
}

#[tokio::test]
async fn test_extractor_keeps_archive_when_configured() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("image.tar.xz");
    create_tar_xz(&archive, &[("payload", b"data")]);

    let extractor = Extractor::new(true);
    let results = [done_result(archive.clone())];

    let first = extractor.extract(&results).await;
    let second = extractor.extract(&results).await;

    assert!(archive.exists());
    for outcomes in [first, second] {
        assert!(matches!(
            status_of(&outcomes[0]),
            ExtractionStatus::Extracted { .. }
        ));
    }
    assert_eq!(std::fs::read(dir.path().join("payload")).unwrap(), b"data");
}

#[tokio::test]
async fn test_extractor_skips_non_archives_and_failed_downloads() {
    let dir = TempDir::new().unwrap();
    let checksum = dir.path().join("Fedora-Container-40-x86_64-CHECKSUM");
    std::fs::write(&checksum, b"SHA256 (x) = 00").unwrap();

    let failed_path = dir.path().join("partial.tar.xz");
    std::fs::write(&failed_path, b"partial").unwrap();
    let url = url::Url::parse("http://mirror.invalid/partial.tar.xz").unwrap();
    let failed = DownloadResult::failed(
        ArtifactTask::new(url, failed_path.clone(), "x86_64", ArtifactKind::Image),
        7,
        TransportError::Cancelled {
            url: "http://mirror.invalid/partial.tar.xz".into(),
        }
        .into(),
    );

    let outcomes = Extractor::new(false)
        .extract(&[done_result(checksum.clone()), failed])
        .await;

    assert_eq!(outcomes.len(), 1, "failed downloads are not inspected");
    assert!(matches!(status_of(&outcomes[0]), ExtractionStatus::Skipped));
    assert_eq!(std::fs::read(&checksum).unwrap(), b"SHA256 (x) = 00");
    assert_eq!(std::fs::read(&failed_path).unwrap(), b"partial");
}

#[tokio::test]
async fn test_extractor_failure_does_not_stop_others() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("a-broken.tar.xz");
    std::fs::write(&broken, b"junk").unwrap();
    let good = dir.path().join("b-good.zip");
    create_zip_archive(&good, &[("good.txt", b"ok")]);

    let (tx, mut rx) = tokio::sync::broadcast::channel(16);
    let outcomes = Extractor::new(false)
        .with_events(tx)
        .extract(&[done_result(broken.clone()), done_result(good.clone())])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(status_of(&outcomes[0]), ExtractionStatus::Failed(_)));
    assert!(broken.exists(), "failed archive stays for inspection");
    assert!(matches!(
        status_of(&outcomes[1]),
        ExtractionStatus::Extracted { .. }
    ));
    assert!(dir.path().join("good.txt").is_file());

    let mut failed_events = 0;
    let mut extracted_events = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::ExtractionFailed { .. } => failed_events += 1,
            Event::Extracted { .. } => extracted_events += 1,
            _ => {}
        }
    }
    assert_eq!((failed_events, extracted_events), (1, 1));
}
