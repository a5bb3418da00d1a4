//! Production [`ArtifactFetcher`] backed by reqwest.

use super::{ArtifactFetcher, ProgressFn};
use crate::config::Config;
use crate::error::{Error, Result, TimeoutPhase, TransportError};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;
use url::Url;

/// Write buffer in front of each destination file
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Streams HTTP responses to disk chunk by chunk
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the pipeline config
    ///
    /// The connect timeout is enforced by the client; the read timeout bounds
    /// the wait for response headers and for every body chunk.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e), "http"))?;

        Ok(Self {
            client,
            read_timeout: config.read_timeout,
        })
    }

    /// Use an existing client, e.g. one shared with other components
    pub fn with_client(client: reqwest::Client, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
        }
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64> {
        let url_str = url.as_str();

        let mut response = tokio::time::timeout(self.read_timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| TransportError::Timeout {
                url: url_str.to_string(),
                phase: TimeoutPhase::Headers,
            })?
            .map_err(|e| TransportError::from_reqwest(url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url_str.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let expected = response.content_length();
        debug!(url = url_str, ?destination, content_length = ?expected, "response received");

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(destination).await?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let mut written: u64 = 0;

        loop {
            let chunk = tokio::time::timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| TransportError::Timeout {
                    url: url_str.to_string(),
                    phase: TimeoutPhase::Read,
                });

            // Partial file stays on disk; flush before returning the error
            let chunk = match chunk {
                Ok(Ok(chunk)) => chunk,
                Ok(Err(e)) => {
                    let _ = writer.flush().await;
                    // Connection closed before Content-Length bytes arrived
                    if let Some(expected) = expected.filter(|n| e.is_body() && written < *n) {
                        return Err(TransportError::Incomplete {
                            url: url_str.to_string(),
                            expected,
                            written,
                        }
                        .into());
                    }
                    return Err(TransportError::from_reqwest(url_str, e).into());
                }
                Err(timeout) => {
                    let _ = writer.flush().await;
                    return Err(timeout.into());
                }
            };

            let Some(chunk) = chunk else { break };
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(written, expected);
        }

        writer.flush().await?;

        if let Some(expected) = expected {
            if expected != written {
                return Err(TransportError::Incomplete {
                    url: url_str.to_string(),
                    expected,
                    written,
                }
                .into());
            }
        }

        Ok(written)
    }
}
