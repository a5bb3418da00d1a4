//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use fedora_artifacts::Config;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path prefix the mock mirror serves composes under
pub const MIRROR_PREFIX: &str = "/compose";

/// Config pointing at `server`, writing into `output_dir`
pub fn mirror_config(server: &MockServer, output_dir: &Path, architectures: &[&str]) -> Config {
    Config {
        output_dir: output_dir.to_path_buf(),
        workers: 4,
        mirror_url: format!("{}{}", server.uri(), MIRROR_PREFIX),
        architectures: architectures.iter().map(|a| a.to_string()).collect(),
        connect_timeout: Duration::from_secs(5),
        read_timeout: Duration::from_secs(5),
        progress_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

/// Request path of a file in a compose images directory
pub fn images_path(segment: &str, label: &str, arch: &str, file: &str) -> String {
    format!(
        "{MIRROR_PREFIX}/{segment}/latest-Fedora-{label}/compose/Container/{arch}/images/{file}"
    )
}

/// OCI-like layout packed as `.tar.xz`
pub fn oci_tar_xz(tag: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let files: [(&str, String); 3] = [
        ("oci-layout", r#"{"imageLayoutVersion":"1.0.0"}"#.to_string()),
        ("index.json", format!(r#"{{"tag":"{tag}"}}"#)),
        (
            "blobs/sha256/0123abcd",
            format!("layer data for {tag}"),
        ),
    ];
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// Serve `body` at `request_path`
pub async fn serve(server: &MockServer, request_path: String, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve a complete catalog for one architecture
pub async fn serve_arch(server: &MockServer, segment: &str, label: &str, arch: &str) {
    serve(
        server,
        images_path(
            segment,
            label,
            arch,
            &format!("Fedora-Container-Base-Generic-{label}.{arch}.oci.tar.xz"),
        ),
        oci_tar_xz(&format!("base-{arch}")),
    )
    .await;
    serve(
        server,
        images_path(
            segment,
            label,
            arch,
            &format!("Fedora-Container-Base-Generic-Minimal-{label}.{arch}.oci.tar.xz"),
        ),
        oci_tar_xz(&format!("minimal-{arch}")),
    )
    .await;
    serve(
        server,
        images_path(
            segment,
            label,
            arch,
            &format!("Fedora-Container-{label}-{arch}-CHECKSUM"),
        ),
        format!("SHA256 (image.oci.tar.xz) = 00ff for {arch}\n").into_bytes(),
    )
    .await;
}
