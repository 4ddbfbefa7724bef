use crate::error::ReplayError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::Client;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Transport-level failure, classified for the retry loop.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unauthorized (http {0})")]
    Unauthorized(u16),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request (http {0})")]
    BadRequest(u16),
    #[error("server error (http {0})")]
    Server(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Transient failures worth another attempt; everything else is
    /// terminal for the slice.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FetchError::Server(_) | FetchError::Transport(_) | FetchError::Io(_)
        )
    }
}

impl From<FetchError> for ReplayError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unauthorized(_) => ReplayError::Unauthorized,
            FetchError::NotFound(url) => ReplayError::NotFound { url },
            FetchError::BadRequest(status) => ReplayError::BadRequest { status },
            FetchError::Io(err) => ReplayError::Io(err),
            other => ReplayError::Unavailable {
                attempts: 1,
                reason: other.to_string(),
            },
        }
    }
}

/// Fetches one slice's compressed payload from the data service.
#[async_trait]
pub trait SliceTransport: Send + Sync + 'static {
    /// GET `url`, returning the gzip-compressed body stream on 200.
    async fn fetch(&self, url: &Url) -> Result<BodyStream, FetchError>;
}

/// Production transport over a shared HTTP client.
pub struct HttpTransport {
    client: Client,
    api_key: String,
}

impl HttpTransport {
    /// `timeout` bounds each attempt end to end, headers and body included.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("tardis-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SliceTransport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<BodyStream, FetchError> {
        let mut request = self.client.get(url.clone());
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        match status {
            200 => {}
            401 | 403 => return Err(FetchError::Unauthorized(status)),
            404 => return Err(FetchError::NotFound(url.to_string())),
            400..=499 => return Err(FetchError::BadRequest(status)),
            _ => return Err(FetchError::Server(status)),
        }
        let stream = response
            .bytes_stream()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_retry() {
        assert!(FetchError::Server(503).is_retriable());
        assert!(FetchError::Io(io::Error::new(io::ErrorKind::Other, "boom")).is_retriable());
        assert!(!FetchError::Unauthorized(401).is_retriable());
        assert!(!FetchError::NotFound("u".into()).is_retriable());
        assert!(!FetchError::BadRequest(422).is_retriable());
    }

    #[test]
    fn terminal_errors_map_to_caller_kinds() {
        assert!(matches!(
            ReplayError::from(FetchError::Unauthorized(403)),
            ReplayError::Unauthorized
        ));
        assert!(matches!(
            ReplayError::from(FetchError::NotFound("u".into())),
            ReplayError::NotFound { .. }
        ));
        assert!(matches!(
            ReplayError::from(FetchError::BadRequest(422)),
            ReplayError::BadRequest { status: 422 }
        ));
    }
}
