//! Batch claiming over the shared task counter.
//!
//! The counter holds the index of the next unclaimed task. Claiming is one
//! indivisible lock-read-advance-release step, so no two workers can ever
//! claim overlapping index ranges and every index up to the task count is
//! claimed exactly once across all workers.

use std::ops::Range;
use std::sync::Mutex;

/// Claim up to `batch_size` task indices, advancing the shared counter.
///
/// Returns `None` once the counter has reached `total`; a worker receiving
/// `None` has no work left and exits. A poisoned lock (a worker panicked
/// while holding it) is recovered by taking the inner value; the counter
/// itself is always in a consistent state because it is only ever advanced
/// in this function.
pub fn claim_batch(counter: &Mutex<usize>, total: usize, batch_size: usize) -> Option<Range<usize>> {
    let mut next = match counter.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if *next >= total {
        return None;
    }
    let start = *next;
    let end = (start + batch_size).min(total);
    *next = end;
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify sequential claims partition the index space without overlap
    // and cover it completely.
    //
    // Given
    // -----
    // - 10 tasks claimed in batches of 3.
    //
    // Expect
    // ------
    // - Ranges 0..3, 3..6, 6..9, 9..10, then None.
    fn claims_partition_and_cover_the_task_range() {
        let counter = Mutex::new(0);

        assert_eq!(claim_batch(&counter, 10, 3), Some(0..3));
        assert_eq!(claim_batch(&counter, 10, 3), Some(3..6));
        assert_eq!(claim_batch(&counter, 10, 3), Some(6..9));
        assert_eq!(claim_batch(&counter, 10, 3), Some(9..10));
        assert_eq!(claim_batch(&counter, 10, 3), None);
    }

    #[test]
    // Purpose
    // -------
    // Verify an empty task list yields no claims at all.
    fn empty_task_lists_yield_no_claims() {
        let counter = Mutex::new(0);
        assert_eq!(claim_batch(&counter, 0, 5), None);
    }

    #[test]
    // Purpose
    // -------
    // Verify concurrent claims over many workers still partition-and-cover:
    // every index claimed exactly once.
    fn concurrent_claims_cover_each_index_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let total = 1000;
        let counter = Mutex::new(0);
        let seen: Vec<AtomicUsize> = (0..total).map(|_| AtomicUsize::new(0)).collect();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    while let Some(range) = claim_batch(&counter, total, 7) {
                        for ix in range {
                            seen[ix].fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        for (ix, count) in seen.iter().enumerate() {
            assert_eq!(count.load(Ordering::Relaxed), 1, "index {ix} claimed wrong number of times");
        }
    }
}
