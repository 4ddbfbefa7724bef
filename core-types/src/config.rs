// Copyright (c) James Kassemi, SC, US. All rights reserved.

use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.tardis.dev";

const DEFAULT_CACHE_DIR_NAME: &str = ".tardis-cache";
const DEFAULT_FETCH_CONCURRENCY: usize = 6;
const DEFAULT_PREFETCH_WINDOW: usize = 16;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client configuration with the key replay knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the data service.
    pub endpoint: String,
    /// Root directory for cached slices.
    pub cache_dir: PathBuf,
    /// API key; empty means anonymous access.
    pub api_key: String,
    /// Concurrent slice downloads.
    pub fetch_concurrency: usize,
    /// Slices scheduled ahead of the delivery cursor.
    pub prefetch_window: usize,
    /// Per-attempt HTTP timeout, headers and body included.
    pub request_timeout: Duration,
    /// Backoff schedule for transient download failures.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_dir: std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME),
            api_key: String::new(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            prefetch_window: DEFAULT_PREFETCH_WINDOW,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default_network(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_prefetch_window(mut self, window: usize) -> Self {
        self.prefetch_window = window.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
