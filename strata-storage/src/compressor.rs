use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use bon::Builder;
use tracing::{debug, info, instrument, warn};

use crate::error::StorageError;
use crate::table::Table;
use crate::types::ChunkId;

#[derive(Debug, Clone, Builder)]
/// Configuration options for compressing a table.
pub struct CompressorOptions {
    #[builder(default = 1)]
    /// The number of worker threads compressing chunks in parallel.
    ///
    /// No more workers than there are chunks to compress are started.
    num_threads: usize,
    #[builder(default = false)]
    /// Also compress the last chunk when it is not full yet.
    ///
    /// A compressed chunk no longer accepts appends, so by default the last chunk
    /// is left as is until it fills up.
    include_partial_chunk: bool,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
/// The outcome of a [Compressor::compress_table] run.
pub struct CompressionSummary {
    /// Chunks that were swapped for their dictionary encoded form.
    pub chunks_compressed: usize,
    /// Chunks that were empty, partial, or already compressed.
    pub chunks_skipped: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

/// Dictionary encodes the chunks of a table using a pool of worker threads.
///
/// Chunk IDs are handed out to the workers through a channel, each worker swaps
/// the chunks it receives via [Table::compress_chunk].
pub struct Compressor {
    options: CompressorOptions,
}

impl Compressor {
    pub fn new(options: CompressorOptions) -> Self {
        Self { options }
    }

    #[instrument("compress-table", skip_all, fields(num_threads = self.options.num_threads))]
    /// Compresses the chunks of the table.
    ///
    /// The first error stops all workers and is returned, chunks compressed before
    /// that point stay compressed.
    pub fn compress_table(&self, table: &Table) -> Result<CompressionSummary, StorageError> {
        let bytes_before = table.estimated_memory_usage();

        let chunks = table.chunks();
        let max_chunk_size = table.max_chunk_size() as usize;
        let last_chunk_id = chunks.len().saturating_sub(1);

        let (tx, rx) = flume::unbounded::<ChunkId>();
        let mut pending = 0;
        let mut skipped = 0;
        for (chunk_id, chunk) in chunks.iter().enumerate() {
            let is_partial = chunk_id == last_chunk_id && chunk.size() < max_chunk_size;
            if chunk.is_empty() || (is_partial && !self.options.include_partial_chunk) {
                skipped += 1;
                continue;
            }

            // The receiver is alive until the end of this function.
            let _ = tx.send(chunk_id as ChunkId);
            pending += 1;
        }
        drop(tx);
        drop(chunks);

        let num_threads = self.options.num_threads.clamp(1, pending.max(1));
        debug!(pending, skipped, num_threads, "Starting compression workers");

        let aborted = AtomicBool::new(false);
        let results: Vec<Result<WorkerStats, StorageError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..num_threads)
                .map(|worker_id| {
                    let rx = rx.clone();
                    let aborted = &aborted;
                    thread::Builder::new()
                        .name(format!("strata-compress-{worker_id}"))
                        .spawn_scoped(scope, move || run_worker(table, rx, aborted))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                    Err(e) => {
                        warn!(error = ?e, "Failed to spawn compression worker");
                        Ok(WorkerStats::default())
                    },
                })
                .collect()
        });

        // Work left behind by workers that failed to spawn.
        let mut fallback = WorkerStats::default();
        if !aborted.load(Ordering::Relaxed) && !rx.is_empty() {
            fallback = run_worker(table, rx, &aborted)?;
        }

        let mut summary = CompressionSummary {
            chunks_skipped: skipped,
            bytes_before,
            ..Default::default()
        };
        for result in results {
            let stats = result?;
            summary.chunks_compressed += stats.compressed;
            summary.chunks_skipped += stats.already_compressed;
        }
        summary.chunks_compressed += fallback.compressed;
        summary.chunks_skipped += fallback.already_compressed;
        summary.bytes_after = table.estimated_memory_usage();

        info!(
            chunks_compressed = summary.chunks_compressed,
            chunks_skipped = summary.chunks_skipped,
            bytes_before = summary.bytes_before,
            bytes_after = summary.bytes_after,
            "Table compression complete",
        );

        Ok(summary)
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    compressed: usize,
    already_compressed: usize,
}

fn run_worker(
    table: &Table,
    chunk_ids: flume::Receiver<ChunkId>,
    aborted: &AtomicBool,
) -> Result<WorkerStats, StorageError> {
    let mut stats = WorkerStats::default();

    while let Ok(chunk_id) = chunk_ids.try_recv() {
        if aborted.load(Ordering::Relaxed) {
            break;
        }

        match table.compress_chunk(chunk_id) {
            Ok(true) => stats.compressed += 1,
            Ok(false) => stats.already_compressed += 1,
            Err(e) => {
                aborted.store(true, Ordering::Relaxed);
                return Err(e);
            },
        }
    }

    Ok(stats)
}
