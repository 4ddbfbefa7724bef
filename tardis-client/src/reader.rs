use crate::error::ReplayError;
use chrono::{DateTime, Utc};
use core_types::types::ReplayRecord;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Why a slice read stopped early, plus how many records it had already
/// delivered (the corrupt-entry recovery path resumes past those).
#[derive(Debug)]
pub(crate) struct SliceReadError {
    pub failure: ReadFailure,
    pub delivered: usize,
}

#[derive(Debug)]
pub(crate) enum ReadFailure {
    /// Malformed line; the entry should be dropped and refetched.
    Corrupt { line: usize, reason: String },
    Io(std::io::Error),
    /// The consumer dropped the stream.
    ConsumerGone,
}

/// Stream one slice's trimmed records into `tx`, line by line.
///
/// Only records with `from <= local_timestamp < to` are delivered. Because
/// in-slice order is non-decreasing, trimming is a prefix skip plus an early
/// stop at the first record past `to`. `skip` additionally drops that many
/// in-window records first, for resuming after a refetch. Returns the number
/// of records delivered by this call.
pub(crate) async fn stream_slice_records(
    file: File,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    skip: usize,
    tx: &mpsc::Sender<Result<ReplayRecord, ReplayError>>,
) -> Result<usize, SliceReadError> {
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    let mut in_window = 0usize;
    let mut delivered = 0usize;
    loop {
        let next = lines.next_line().await.map_err(|err| SliceReadError {
            failure: ReadFailure::Io(err),
            delivered,
        })?;
        let Some(line) = next else { break };
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        let record = parse_line(&line).map_err(|reason| SliceReadError {
            failure: ReadFailure::Corrupt {
                line: line_no,
                reason,
            },
            delivered,
        })?;
        if record.local_timestamp < from {
            continue;
        }
        if record.local_timestamp >= to {
            break;
        }
        in_window += 1;
        if in_window <= skip {
            continue;
        }
        if tx.send(Ok(record)).await.is_err() {
            return Err(SliceReadError {
                failure: ReadFailure::ConsumerGone,
                delivered,
            });
        }
        delivered += 1;
    }
    Ok(delivered)
}

/// One line of a cache entry: an ISO-8601 UTC timestamp, a single space,
/// and the venue message as JSON.
pub(crate) fn parse_line(line: &str) -> Result<ReplayRecord, String> {
    let (timestamp, payload) = line
        .split_once(' ')
        .ok_or_else(|| "missing timestamp/message delimiter".to_string())?;
    let local_timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|err| format!("bad timestamp {timestamp:?}: {err}"))?
        .with_timezone(&Utc);
    let message =
        serde_json::from_str(payload).map_err(|err| format!("bad message payload: {err}"))?;
    Ok(ReplayRecord {
        local_timestamp,
        message,
    })
}
