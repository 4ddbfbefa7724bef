use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors surfaced to the replay consumer.
///
/// Errors hit by a fetch task are latched on that task's slice and surface
/// only when the delivery cursor reaches it; earlier slices drain normally.
/// The first surfaced error terminates the stream.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unauthorized: the requested slices require a valid API key")]
    Unauthorized,
    #[error("slice not found at {url}: outside the service's coverage")]
    NotFound { url: String },
    #[error("service rejected the request (http {status})")]
    BadRequest { status: u16 },
    #[error("service unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { attempts: usize, reason: String },
    #[error("corrupt cache entry {}: {reason}", .path.display())]
    CorruptCache { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
