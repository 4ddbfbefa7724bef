use crate::error::ReplayError;
use crate::fetch::SliceFetcher;
use crate::reader::{stream_slice_records, ReadFailure, SliceReadError};
use chrono::{DateTime, Utc};
use core_types::types::{Channel, ReplayRecord};
use futures::Stream;
use log::{debug, info, warn};
use slice_cache::{slice_minutes, SliceAddress, SliceCache};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Records buffered between the delivery loop and the consumer.
const RECORD_CHANNEL_CAPACITY: usize = 1024;

pub(crate) struct ReplayJob {
    pub fetcher: Arc<SliceFetcher>,
    pub cache: Arc<SliceCache>,
    pub exchange: String,
    pub filters: Vec<Channel>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub fetch_concurrency: usize,
    pub prefetch_window: usize,
}

/// Single-consumer stream of replayed records in slice order.
///
/// Dropping the stream cancels all in-flight slice downloads.
#[must_use = "a replay does nothing until polled"]
pub struct ReplayStream {
    records: ReceiverStream<Result<ReplayRecord, ReplayError>>,
    _cancel_on_drop: DropGuard,
}

impl Stream for ReplayStream {
    type Item = Result<ReplayRecord, ReplayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.records).poll_next(cx)
    }
}

pub(crate) fn spawn(job: ReplayJob) -> ReplayStream {
    let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    tokio::spawn(run(job, tx, cancel.clone()));
    ReplayStream {
        records: ReceiverStream::new(rx),
        _cancel_on_drop: cancel.drop_guard(),
    }
}

enum FetchOutcome {
    Ready(PathBuf),
    Cancelled,
}

enum Delivery {
    Failed(ReplayError),
    ConsumerGone,
}

async fn run(
    job: ReplayJob,
    tx: mpsc::Sender<Result<ReplayRecord, ReplayError>>,
    cancel: CancellationToken,
) {
    let addresses: Vec<SliceAddress> = slice_minutes(job.from, job.to)
        .into_iter()
        .map(|minute| SliceAddress::new(&job.exchange, minute, &job.filters))
        .collect();
    info!(
        "replaying {} slice(s) of {} between {} and {}",
        addresses.len(),
        job.exchange,
        job.from,
        job.to
    );

    let semaphore = Arc::new(Semaphore::new(job.fetch_concurrency));
    let mut inflight: VecDeque<JoinHandle<Result<FetchOutcome, ReplayError>>> = VecDeque::new();
    let mut scheduled = 0usize;

    let outcome = deliver(
        &job,
        &addresses,
        &tx,
        &cancel,
        &semaphore,
        &mut inflight,
        &mut scheduled,
    )
    .await;

    // Stop and drain outstanding fetch tasks on every exit path so nothing
    // keeps the network or the cache busy past the stream's end.
    cancel.cancel();
    while let Some(handle) = inflight.pop_front() {
        let _ = handle.await;
    }

    match outcome {
        Ok(()) => debug!("replay of {} complete", job.exchange),
        Err(Delivery::ConsumerGone) => debug!("replay of {} abandoned by consumer", job.exchange),
        Err(Delivery::Failed(err)) => {
            let _ = tx.send(Err(err)).await;
        }
    }
}

/// In-order delivery loop: awaits slice `k`, streams its trimmed records,
/// then widens the prefetch window by one. Fetches complete out of order but
/// errors latch in their join handles until the cursor reaches them.
async fn deliver(
    job: &ReplayJob,
    addresses: &[SliceAddress],
    tx: &mpsc::Sender<Result<ReplayRecord, ReplayError>>,
    cancel: &CancellationToken,
    semaphore: &Arc<Semaphore>,
    inflight: &mut VecDeque<JoinHandle<Result<FetchOutcome, ReplayError>>>,
    scheduled: &mut usize,
) -> Result<(), Delivery> {
    for index in 0..addresses.len() {
        while *scheduled < addresses.len() && *scheduled < index + job.prefetch_window {
            inflight.push_back(spawn_fetch(
                job.fetcher.clone(),
                addresses[*scheduled].clone(),
                semaphore.clone(),
                cancel.clone(),
            ));
            *scheduled += 1;
        }
        let handle = inflight.pop_front().expect("prefetch window never empty");
        let path = match handle.await {
            Ok(Ok(FetchOutcome::Ready(path))) => path,
            Ok(Ok(FetchOutcome::Cancelled)) => return Err(Delivery::ConsumerGone),
            Ok(Err(err)) => return Err(Delivery::Failed(err)),
            Err(join_err) => {
                return Err(Delivery::Failed(ReplayError::Unavailable {
                    attempts: 1,
                    reason: format!("fetch task failed: {join_err}"),
                }))
            }
        };
        stream_slice(job, &addresses[index], &path, tx).await?;
    }
    Ok(())
}

fn spawn_fetch(
    fetcher: Arc<SliceFetcher>,
    address: SliceAddress,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> JoinHandle<Result<FetchOutcome, ReplayError>> {
    tokio::spawn(async move {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Ok(FetchOutcome::Cancelled),
            permit = semaphore.acquire_owned() => permit.expect("fetch pool semaphore"),
        };
        tokio::select! {
            _ = cancel.cancelled() => Ok(FetchOutcome::Cancelled),
            result = fetcher.ensure_cached(&address) => result.map(FetchOutcome::Ready),
        }
    })
}

/// Stream one slice to the consumer, recovering once from a corrupt entry
/// by dropping it and refetching, resuming past already-delivered records.
async fn stream_slice(
    job: &ReplayJob,
    address: &SliceAddress,
    path: &Path,
    tx: &mpsc::Sender<Result<ReplayRecord, ReplayError>>,
) -> Result<(), Delivery> {
    let resume_from = match read_slice(job, address, 0, tx).await {
        Ok(_) => return Ok(()),
        Err(SliceReadError {
            failure: ReadFailure::Corrupt { line, reason },
            delivered,
        }) => {
            warn!(
                "corrupt cache entry {address} (line {line}): {reason}; dropping and refetching"
            );
            if let Err(err) = job.cache.remove(address).await {
                return Err(Delivery::Failed(err.into()));
            }
            if let Err(err) = job.fetcher.download(address).await {
                return Err(Delivery::Failed(err));
            }
            delivered
        }
        Err(SliceReadError {
            failure: ReadFailure::Io(err),
            ..
        }) => return Err(Delivery::Failed(err.into())),
        Err(SliceReadError {
            failure: ReadFailure::ConsumerGone,
            ..
        }) => return Err(Delivery::ConsumerGone),
    };

    match read_slice(job, address, resume_from, tx).await {
        Ok(_) => Ok(()),
        Err(SliceReadError {
            failure: ReadFailure::Corrupt { line, reason },
            ..
        }) => Err(Delivery::Failed(ReplayError::CorruptCache {
            path: path.to_path_buf(),
            reason: format!("line {line}: {reason}"),
        })),
        Err(SliceReadError {
            failure: ReadFailure::Io(err),
            ..
        }) => Err(Delivery::Failed(err.into())),
        Err(SliceReadError {
            failure: ReadFailure::ConsumerGone,
            ..
        }) => Err(Delivery::ConsumerGone),
    }
}

async fn read_slice(
    job: &ReplayJob,
    address: &SliceAddress,
    skip: usize,
    tx: &mpsc::Sender<Result<ReplayRecord, ReplayError>>,
) -> Result<usize, SliceReadError> {
    let file = job
        .cache
        .open_for_read(address)
        .await
        .map_err(|err| SliceReadError {
            failure: ReadFailure::Io(err),
            delivered: 0,
        })?;
    stream_slice_records(file, job.from, job.to, skip, tx).await
}
