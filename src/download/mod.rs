//! Download worker pool
//!
//! A fixed number of workers drain a shared queue of [`ArtifactTask`]s. Each
//! worker streams one response to disk at a time through an [`ArtifactFetcher`];
//! failures are recorded per task and never stop sibling workers.
//!
//! [`ArtifactTask`]: crate::types::ArtifactTask

mod http;
mod pool;


pub use http::HttpFetcher;
pub use pool::WorkerPool;

use crate::error::Result;
use std::path::Path;
use url::Url;

/// Callback receiving `(bytes_written, content_length)` after each chunk
pub type ProgressFn<'a> = dyn FnMut(u64, Option<u64>) + Send + 'a;

/// Abstraction over fetching one artifact to disk, enabling testability.
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch `url` into `destination`, returning the number of bytes written
    ///
    /// Implementations write sequentially and leave whatever was written in
    /// place when they fail.
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64>;
}
