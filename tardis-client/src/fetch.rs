use crate::error::ReplayError;
use crate::transport::{FetchError, SliceTransport};
use async_compression::tokio::bufread::GzipDecoder;
use core_types::retry::RetryPolicy;
use log::{debug, warn};
use slice_cache::{SliceAddress, SliceCache};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::io::StreamReader;
use url::Url;

/// Ensures slices are present in the local cache, downloading and
/// decompressing them from the data service when absent.
pub struct SliceFetcher {
    transport: Arc<dyn SliceTransport>,
    cache: Arc<SliceCache>,
    endpoint: String,
    retry: RetryPolicy,
}

impl SliceFetcher {
    pub fn new(
        transport: Arc<dyn SliceTransport>,
        cache: Arc<SliceCache>,
        endpoint: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            cache,
            endpoint: endpoint.into(),
            retry,
        }
    }

    /// Return the committed entry for `address`, downloading when absent.
    pub async fn ensure_cached(&self, address: &SliceAddress) -> Result<PathBuf, ReplayError> {
        if self.cache.has(address) {
            debug!("slice {address} already cached");
            return Ok(self.cache.entry_path(address));
        }
        self.download(address).await
    }

    /// Unconditionally download and commit `address`.
    ///
    /// Transient failures (5xx, connection drops, mid-body read errors) back
    /// off and retry per the policy; auth and coverage failures are terminal
    /// on the first attempt. Any partial write is discarded by the store.
    pub async fn download(&self, address: &SliceAddress) -> Result<PathBuf, ReplayError> {
        let url = address
            .remote_url(&self.endpoint)
            .map_err(|err| ReplayError::InvalidArgument(format!("endpoint: {err}")))?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(&url, address).await {
                Ok(path) => {
                    debug!("fetched slice {address} in {attempt} attempt(s)");
                    return Ok(path);
                }
                Err(err) if !err.is_retriable() => {
                    warn!("slice {address} fetch failed: {err}");
                    return Err(err.into());
                }
                Err(err) if attempt >= self.retry.max_attempts => {
                    warn!("slice {address} fetch failed after {attempt} attempt(s): {err}");
                    return Err(match err {
                        FetchError::Io(io_err) => ReplayError::Io(io_err),
                        other => ReplayError::Unavailable {
                            attempts: attempt,
                            reason: other.to_string(),
                        },
                    });
                }
                Err(err) => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "slice {address} fetch attempt {attempt} failed ({err}); retrying in {delay:?}"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &Url, address: &SliceAddress) -> Result<PathBuf, FetchError> {
        let body = self.transport.fetch(url).await?;
        // The service compresses on the wire; the cache holds the decoded form.
        let mut decoder = GzipDecoder::new(StreamReader::new(body));
        let path = self.cache.publish(address, &mut decoder).await?;
        Ok(path)
    }
}
