use crate::db::CaptacaoStore;
use crate::models::NormalizedRecord;

/// Rows submitted to the store per insert call. Tunable via
/// `--chunk-size`; correctness does not depend on the value.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Reported to the caller after every batch, failed or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based index of the batch that just finished.
    pub batch: usize,
    pub total_batches: usize,
    pub inserted_so_far: usize,
}

#[derive(Debug, Default)]
pub struct CommitOutcome {
    pub inserted: usize,
    pub failed_rows: usize,
    pub errors: Vec<String>,
}

impl CommitOutcome {
    /// Every batch failed and there was something to commit.
    pub fn is_total_failure(&self) -> bool {
        self.inserted == 0 && self.failed_rows > 0
    }
}

/// Persist `records` in fixed-size batches, strictly in order and never
/// concurrently. A failing batch is recorded and skipped; it does not
/// roll back earlier batches and does not stop later ones. No retries.
pub fn commit_in_batches(
    store: &mut dyn CaptacaoStore,
    records: &[NormalizedRecord],
    chunk_size: usize,
    mut on_batch_complete: impl FnMut(BatchProgress),
) -> CommitOutcome {
    let chunk_size = chunk_size.max(1);
    let total_batches = records.len().div_ceil(chunk_size);
    let mut outcome = CommitOutcome::default();

    for (i, chunk) in records.chunks(chunk_size).enumerate() {
        match store.insert_batch(chunk) {
            Ok(()) => outcome.inserted += chunk.len(),
            Err(e) => {
                outcome.failed_rows += chunk.len();
                outcome.errors.push(format!("batch {}/{total_batches}: {e}", i + 1));
            }
        }
        on_batch_complete(BatchProgress {
            batch: i + 1,
            total_batches,
            inserted_so_far: outcome.inserted,
        });
    }
    outcome
}
