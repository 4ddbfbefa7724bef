//! Streaming replay of historical tick-level market data.
//!
//! [`TardisClient::replay`] yields every message a venue published between
//! two UTC instants, in original wire order, as a lazy async stream. Data
//! arrives from the remote service in one-minute gzip slices which are
//! cached on disk, so repeated replays run at disk speed with no network.
//!
//! ```no_run
//! use futures::StreamExt;
//! use tardis_client::{Channel, TardisClient};
//!
//! # async fn example() -> Result<(), tardis_client::ReplayError> {
//! let client = TardisClient::new();
//! let mut replay = client.replay(
//!     "bitmex",
//!     "2019-06-01",
//!     "2019-06-01T00:02:00Z",
//!     &[Channel::new("trade", ["XBTUSD"])],
//! )?;
//! while let Some(record) = replay.next().await {
//!     let record = record?;
//!     println!("{} {}", record.local_timestamp, record.message);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod fetch;
mod reader;
mod replay;
mod transport;
mod validate;

pub use core_types::config::ClientConfig;
pub use core_types::retry::RetryPolicy;
pub use core_types::types::{Channel, ReplayRecord};
pub use error::{ReplayError, Result};
pub use replay::ReplayStream;

use crate::fetch::SliceFetcher;
use crate::replay::ReplayJob;
use crate::transport::{HttpTransport, SliceTransport};
use slice_cache::SliceCache;
use std::sync::Arc;

/// Client for the historical market-data service.
pub struct TardisClient {
    config: ClientConfig,
    cache: Arc<SliceCache>,
    fetcher: Arc<SliceFetcher>,
}

impl TardisClient {
    /// Client with defaults: anonymous access, cache under the OS temp dir.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(
            config.api_key.clone(),
            config.request_timeout,
        ));
        Self::with_transport(config, transport)
    }

    pub(crate) fn with_transport(config: ClientConfig, transport: Arc<dyn SliceTransport>) -> Self {
        let cache = Arc::new(SliceCache::new(config.cache_dir.clone()));
        let fetcher = Arc::new(SliceFetcher::new(
            transport,
            cache.clone(),
            config.endpoint.clone(),
            config.retry.clone(),
        ));
        Self {
            config,
            cache,
            fetcher,
        }
    }

    /// Replay `[from_date, to_date)` for `exchange` as a lazy record stream.
    ///
    /// Dates accept `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 datetime.
    /// An empty `filters` list replays every channel. Arguments are checked
    /// before any I/O happens; must be called within a Tokio runtime.
    pub fn replay(
        &self,
        exchange: &str,
        from_date: &str,
        to_date: &str,
        filters: &[Channel],
    ) -> Result<ReplayStream> {
        let (from, to) = validate::time_range(from_date, to_date)?;
        validate::exchange_filters(exchange, filters)?;
        Ok(replay::spawn(ReplayJob {
            fetcher: self.fetcher.clone(),
            cache: self.cache.clone(),
            exchange: exchange.to_string(),
            filters: filters.to_vec(),
            from,
            to,
            fetch_concurrency: self.config.fetch_concurrency,
            prefetch_window: self.config.prefetch_window,
        }))
    }

    /// Delete the on-disk slice cache. Safe while no replay is active.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await.map_err(Into::into)
    }
}

impl Default for TardisClient {
    fn default() -> Self {
        Self::new()
    }
}
