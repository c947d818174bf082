//! Concurrent execution of chunk fetches.

use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use crate::fetch::RangeFetcher;
use crate::segmenter::Chunk;

use super::segment;
use super::DownloadError;

/// Runs one scoped worker per chunk, each writing only its own disjoint slice
/// of `buffer`. Waits for every worker. On failure the error of the lowest
/// failing chunk index is returned and the buffer contents are unspecified.
///
/// `chunks` must be ordered and contiguous from offset 0, as produced by
/// [`crate::segmenter::plan_chunks`].
pub(super) fn run_chunks(
    fetcher: &RangeFetcher,
    url: &str,
    chunks: &[Chunk],
    buffer: &mut [u8],
    deadline: Option<Instant>,
) -> Result<(), DownloadError> {
    if chunks.is_empty() {
        return Ok(());
    }

    let mut slots: Vec<(&Chunk, &mut [u8])> = Vec::with_capacity(chunks.len());
    let mut rest = buffer;
    for chunk in chunks {
        let (slot, tail) = std::mem::take(&mut rest).split_at_mut(chunk.len() as usize);
        slots.push((chunk, slot));
        rest = tail;
    }

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(slots.len());
        for (chunk, slot) in slots {
            let tx = tx.clone();
            let handle = scope.spawn(move || {
                let res = segment::fetch_chunk(fetcher, url, chunk, slot, deadline);
                let _ = tx.send((chunk.index, res));
            });
            handles.push((chunk.index, handle));
        }
        drop(tx);

        let mut first_error: Option<DownloadError> = None;
        let mut record = |err: DownloadError| {
            let replace = match (&first_error, err.chunk_index()) {
                (None, _) => true,
                (Some(current), Some(index)) => current.chunk_index().map_or(false, |c| index < c),
                (Some(_), None) => false,
            };
            if replace {
                first_error = Some(err);
            }
        };

        for (index, res) in rx {
            if let Err(e) = res {
                tracing::warn!(url, chunk = index, error = %e, "chunk failed");
                record(e);
            }
        }
        // A panicking worker never sends; joining here keeps the panic out of the scope.
        for (index, handle) in handles {
            if handle.join().is_err() {
                tracing::warn!(url, chunk = index, "chunk worker panicked");
                record(DownloadError::WorkerPanicked { index });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}
