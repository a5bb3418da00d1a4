//! URL resolver turning a [`ReleaseSpec`] into the ordered artifact catalog
//!
//! Pure construction: nothing here touches the network or the filesystem.
//!
//! Layout of a container compose on the mirror:
//!
//! ```text
//! {mirror}/{segment}/latest-Fedora-{label}/compose/Container/{arch}/images/
//!     Fedora-Container-Base-Generic-{label}.{arch}.oci.tar.xz
//!     Fedora-Container-Base-Generic-Minimal-{label}.{arch}.oci.tar.xz
//!     Fedora-Container-{label}-{arch}-CHECKSUM
//! ```
//!
//! Locally, images land in `{output_dir}/{arch}/base/` and
//! `{output_dir}/{arch}/minimal/`; the checksum manifest in `{output_dir}/{arch}/`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::release::{Channel, ReleaseSpec};
use crate::types::{ArtifactKind, ArtifactTask};
use std::path::Path;
use url::Url;

/// Catalog entries per architecture, in emission order
const FULL_CATALOG: &[ArtifactKind] = &[
    ArtifactKind::Image,
    ArtifactKind::MinimalImage,
    ArtifactKind::Checksum,
];

/// Resolve the tasks for `spec`, writing into `config.output_dir`
///
/// With [`ReleaseSpec::is_minimal`] the result is exactly one task: the minimal
/// base image for the primary architecture. Otherwise every architecture gets
/// the full catalog, architectures in configured order.
pub fn resolve(spec: &ReleaseSpec, config: &Config) -> Result<Vec<ArtifactTask>> {
    let mirror = config.mirror()?;
    let channel = spec.channel();

    if spec.is_minimal() {
        let arch = config.primary_architecture().ok_or_else(|| {
            Error::config("at least one architecture is required", "architectures")
        })?;
        let task = build_task(
            &mirror,
            &channel,
            arch,
            ArtifactKind::MinimalImage,
            &config.output_dir,
        )?;
        return Ok(vec![task]);
    }

    let mut tasks = Vec::with_capacity(config.architectures.len() * FULL_CATALOG.len());
    for arch in &config.architectures {
        for kind in FULL_CATALOG {
            tasks.push(build_task(
                &mirror,
                &channel,
                arch,
                *kind,
                &config.output_dir,
            )?);
        }
    }

    tracing::debug!(
        release = %spec,
        tasks = tasks.len(),
        "resolved artifact catalog"
    );

    Ok(tasks)
}

/// File name of a catalog entry
pub fn artifact_file_name(channel: &Channel, arch: &str, kind: ArtifactKind) -> String {
    let label = channel.label();
    match kind {
        ArtifactKind::Image => format!("Fedora-Container-Base-Generic-{label}.{arch}.oci.tar.xz"),
        ArtifactKind::MinimalImage => {
            format!("Fedora-Container-Base-Generic-Minimal-{label}.{arch}.oci.tar.xz")
        }
        ArtifactKind::Checksum => format!("Fedora-Container-{label}-{arch}-CHECKSUM"),
    }
}

/// Directory on the mirror holding the images for `arch`
pub fn images_url(mirror: &Url, channel: &Channel, arch: &str) -> Result<Url> {
    let compose = format!("latest-Fedora-{}", channel.label());
    let mut url = mirror.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            Error::config(
                format!("mirror URL '{}' cannot be used as a base", mirror),
                "mirror_url",
            )
        })?;
        segments.pop_if_empty().extend([
            channel.segment(),
            compose.as_str(),
            "compose",
            "Container",
            arch,
            "images",
        ]);
    }
    Ok(url)
}

fn build_task(
    mirror: &Url,
    channel: &Channel,
    arch: &str,
    kind: ArtifactKind,
    output_dir: &Path,
) -> Result<ArtifactTask> {
    let file_name = artifact_file_name(channel, arch, kind);
    let mut url = images_url(mirror, channel, arch)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(&file_name);
    }
    let mut destination = output_dir.join(arch);
    if let Some(subdir) = kind.subdirectory() {
        destination.push(subdir);
    }
    destination.push(&file_name);
    Ok(ArtifactTask::new(url, destination, arch, kind))
}
