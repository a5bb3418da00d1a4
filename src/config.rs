//! Configuration types for fedora-artifacts

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default compose root on the Fedora build system
pub const DEFAULT_MIRROR_URL: &str = "https://kojipkgs.fedoraproject.org/compose";

/// Architectures published for container composes, in catalog order
pub const DEFAULT_ARCHITECTURES: &[&str] = &["aarch64", "ppc64le", "s390x", "x86_64"];

/// Main configuration for the acquisition pipeline
///
/// Every field has a default, so an empty JSON object is a valid config.
/// The CLI loads an optional JSON file first and then applies flag overrides.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory artifacts are written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of concurrent download workers (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Compose root URL (default: kojipkgs.fedoraproject.org/compose)
    ///
    /// File names are derived without listing the directory, so the mirror
    /// must serve undated names such as
    /// `{channel}/latest-Fedora-{label}/compose/Container/{arch}/images/Fedora-Container-Base-Generic-{label}.{arch}.oci.tar.xz`.
    /// Composes that embed a compose ID or date in their file names need a
    /// mirror (or symlink farm) exposing that layout.
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,

    /// Architectures to fetch; the first one is used for the minimal set
    #[serde(default = "default_architectures")]
    pub architectures: Vec<String>,

    /// Connection timeout, in seconds when serialized (default: 30s)
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Maximum wait for headers or for the next body chunk (default: 60s)
    #[serde(default = "default_read_timeout", with = "duration_secs")]
    pub read_timeout: Duration,

    /// Keep archives on disk after a successful extraction (default: false)
    #[serde(default)]
    pub keep_archives: bool,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum interval between progress events per download, in milliseconds
    #[serde(default = "default_progress_interval", with = "duration_millis")]
    pub progress_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            workers: default_workers(),
            mirror_url: default_mirror_url(),
            architectures: default_architectures(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            keep_archives: false,
            user_agent: default_user_agent(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl Config {
    /// Load a config from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                format!("failed to read config file {}: {}", path.display(), e),
                "config",
            )
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::config(
                format!("invalid config file {}: {}", path.display(), e),
                "config",
            )
        })
    }

    /// Check invariants that cannot be expressed in the type
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers must be at least 1", "workers"));
        }

        let mirror = self.mirror()?;
        if mirror.cannot_be_a_base() {
            return Err(Error::config(
                format!("mirror URL '{}' cannot be used as a base", self.mirror_url),
                "mirror_url",
            ));
        }

        if self.architectures.is_empty() {
            return Err(Error::config(
                "at least one architecture is required",
                "architectures",
            ));
        }
        if let Some(bad) = self
            .architectures
            .iter()
            .find(|arch| !crate::release::is_valid_segment(arch))
        {
            return Err(Error::config(
                format!("invalid architecture '{}'", bad),
                "architectures",
            ));
        }

        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(Error::config("timeouts must be non-zero", "timeout"));
        }

        Ok(())
    }

    /// Parsed mirror URL
    pub fn mirror(&self) -> Result<Url> {
        Url::parse(&self.mirror_url).map_err(|e| {
            Error::config(
                format!("invalid mirror URL '{}': {}", self.mirror_url, e),
                "mirror_url",
            )
        })
    }

    /// Architecture used when only the minimal set is requested
    pub fn primary_architecture(&self) -> Option<&str> {
        self.architectures.first().map(String::as_str)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_workers() -> usize {
    5
}

fn default_mirror_url() -> String {
    DEFAULT_MIRROR_URL.to_string()
}

fn default_architectures() -> Vec<String> {
    DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
