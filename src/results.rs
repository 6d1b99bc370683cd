use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Status-array element for a row that succeeded without a per-row count.
pub const SUCCESS_NO_INFO: i32 = -2;
/// Status-array element for a row in a batch that reported an error.
pub const EXECUTE_FAILED: i32 = -3;

#[derive(Debug, Clone, Copy)]
struct KeyBlock {
    first_id: u64,
    len: u64,
    increment: u64,
}

/// Per-statement accounting for one batch execution.
///
/// Populated as replies arrive — one update-count entry per flushed command,
/// plus compact generated-key blocks for bulk inserts — and queried by the
/// caller once the batch completes. The reply-reading path and the querying
/// caller may run on different threads, so every collection is guarded; a
/// query taken while replies are still arriving sees a consistent snapshot
/// of what has been appended so far.
///
/// The protocol reports success and failure per bulk unit, not per row, so a
/// single error marks every row of the batch as failed in the status arrays.
/// That loss of granularity is inherent to the wire format, not repairable
/// here.
#[derive(Debug, Default)]
pub struct BatchResult {
    update_counts: Mutex<Vec<u64>>,
    key_blocks: Mutex<Vec<KeyBlock>>,
    has_error: AtomicBool,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one reply's affected-row total to the ledger.
    pub fn add_success(&self, affected_rows: u64) {
        self.update_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(affected_rows);
    }

    /// Record a server-reported execution failure. Sticky: once set it marks
    /// every row of the batch as failed for the life of this accounting.
    pub fn add_error(&self) {
        self.has_error.store(true, Ordering::Release);
    }

    /// Append one generated-key block `(first_id, len, increment)`. Called
    /// once per server reply that carried insert-id information, not once
    /// per logical row.
    pub fn add_key_block(&self, first_id: u64, len: u64, increment: u64) {
        self.key_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(KeyBlock {
                first_id,
                len,
                increment,
            });
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::Acquire)
    }

    /// Sum of the ledger, or `None` when no reply has been recorded yet.
    pub fn total_affected_rows(&self) -> Option<u64> {
        let counts = self
            .update_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if counts.is_empty() {
            return None;
        }
        Some(counts.iter().sum())
    }

    /// Number of replies recorded so far.
    pub fn stat_count(&self) -> usize {
        self.update_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Per-row status array: one element per affected row, every element
    /// [`SUCCESS_NO_INFO`], or [`EXECUTE_FAILED`] everywhere once any error
    /// was recorded.
    pub fn update_counts(&self) -> Vec<i32> {
        let size = self.total_affected_rows().unwrap_or(0) as usize;
        let fill = if self.has_error() {
            EXECUTE_FAILED
        } else {
            SUCCESS_NO_INFO
        };
        vec![fill; size]
    }

    /// [`update_counts`](Self::update_counts) widened to `i64`.
    pub fn large_update_counts(&self) -> Vec<i64> {
        let size = self.total_affected_rows().unwrap_or(0) as usize;
        let fill = if self.has_error() {
            EXECUTE_FAILED as i64
        } else {
            SUCCESS_NO_INFO as i64
        };
        vec![fill; size]
    }

    /// Counts accessor for the query-rewriting batch strategy. That strategy
    /// never feeds this accounting, so there is nothing to report.
    pub fn rewrite_update_counts(&self) -> Option<Vec<i32>> {
        None
    }

    /// See [`rewrite_update_counts`](Self::rewrite_update_counts).
    pub fn rewrite_large_update_counts(&self) -> Option<Vec<i64>> {
        None
    }

    /// All generated keys in row-submission order, each block expanded as
    /// `first_id + i * increment`.
    ///
    /// Positional alignment with the submitted rows holds only when no row
    /// failed and the server left no auto-increment gaps.
    pub fn generated_keys(&self) -> Vec<u64> {
        let blocks = self
            .key_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let total: u64 = blocks.iter().map(|block| block.len).sum();
        let mut keys = Vec::with_capacity(total as usize);
        for block in blocks.iter() {
            for i in 0..block.len {
                keys.push(block.first_id + i * block.increment);
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_matches_success_count() {
        let result = BatchResult::new();
        for _ in 0..5 {
            result.add_success(1);
        }
        assert_eq!(result.total_affected_rows(), Some(5));
        assert_eq!(result.stat_count(), 5);
    }

    #[test]
    fn test_empty_ledger_has_no_total() {
        let result = BatchResult::new();
        assert_eq!(result.total_affected_rows(), None);
        assert!(result.update_counts().is_empty());
    }

    #[test]
    fn test_status_array_success() {
        let result = BatchResult::new();
        result.add_success(3);
        result.add_success(2);

        let counts = result.update_counts();
        assert_eq!(counts.len(), 5);
        assert!(counts.iter().all(|&status| status == SUCCESS_NO_INFO));
        assert_eq!(result.large_update_counts().len(), 5);
    }

    #[test]
    fn test_error_taints_every_row() {
        let result = BatchResult::new();
        result.add_success(4);
        result.add_error();
        result.add_success(2);

        let counts = result.update_counts();
        assert_eq!(counts.len(), 6);
        assert!(counts.iter().all(|&status| status == EXECUTE_FAILED));
        assert!(result.has_error());
    }

    #[test]
    fn test_generated_key_expansion() {
        let result = BatchResult::new();
        result.add_key_block(100, 3, 1);
        assert_eq!(result.generated_keys(), vec![100, 101, 102]);

        let stepped = BatchResult::new();
        stepped.add_key_block(100, 3, 5);
        assert_eq!(stepped.generated_keys(), vec![100, 105, 110]);
    }

    #[test]
    fn test_key_blocks_concatenate_in_arrival_order() {
        let result = BatchResult::new();
        result.add_key_block(10, 2, 1);
        result.add_key_block(50, 2, 1);
        assert_eq!(result.generated_keys(), vec![10, 11, 50, 51]);
    }

    #[test]
    fn test_rewrite_counts_unsupported() {
        let result = BatchResult::new();
        result.add_success(1);
        assert_eq!(result.rewrite_update_counts(), None);
        assert_eq!(result.rewrite_large_update_counts(), None);
    }

    #[test]
    fn test_concurrent_append_and_query() {
        let result = BatchResult::new();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..1000 {
                    result.add_success(1);
                    result.add_key_block(i * 10, 1, 1);
                }
            });

            // Queries must observe a consistent prefix while appends race.
            for _ in 0..100 {
                let total = result.total_affected_rows().unwrap_or(0);
                assert!(total <= 1000);
                assert!(result.update_counts().len() >= total as usize);
                assert!(result.generated_keys().len() <= 1000);
            }
        });

        assert_eq!(result.total_affected_rows(), Some(1000));
        assert_eq!(result.generated_keys().len(), 1000);
    }
}
