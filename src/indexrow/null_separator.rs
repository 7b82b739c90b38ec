//! # Null Separator Allocation
//!
//! A unique index cannot rely on its key columns alone to distinguish two
//! rows whose declared values are identical but contain NULLs: SQL NULL is
//! not self-equal, so such rows must never collide as duplicates. Every row
//! of a nullable unique index therefore carries one extra integer field —
//! zero when the row has no NULL key column, otherwise a separator value
//! issued here, unique within the index.
//!
//! The allocator is the one piece of shared mutable state in this crate.
//! Counters are kept per index id and issue monotonically increasing values
//! starting at 1, so an issued separator is always nonzero and can never
//! collide with the no-nulls marker. Callers share one allocator per process
//! via `Arc`.

use hashbrown::HashMap;
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct NullSeparatorAllocator {
    counters: Mutex<HashMap<u64, u64>>,
}

impl NullSeparatorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next separator value for `index_id`. Never returns zero;
    /// concurrent callers never observe the same value for the same index.
    pub fn next_value(&self, index_id: u64) -> u64 {
        let mut counters = self.counters.lock();
        let counter = counters.entry(index_id).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn values_are_nonzero_and_increasing() {
        let allocator = NullSeparatorAllocator::new();
        assert_eq!(allocator.next_value(7), 1);
        assert_eq!(allocator.next_value(7), 2);
        assert_eq!(allocator.next_value(7), 3);
    }

    #[test]
    fn counters_are_independent_per_index() {
        let allocator = NullSeparatorAllocator::new();
        allocator.next_value(1);
        allocator.next_value(1);
        assert_eq!(allocator.next_value(2), 1);
    }

    #[test]
    fn concurrent_callers_never_share_a_value() {
        let allocator = Arc::new(NullSeparatorAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let allocator = Arc::clone(&allocator);
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| allocator.next_value(42)).collect::<Vec<_>>()
            }));
        }
        let mut seen = Vec::new();
        for handle in handles {
            seen.extend(handle.join().unwrap());
        }
        seen.sort_unstable();
        let before = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), before, "duplicate separator issued");
        assert!(!seen.contains(&0));
    }
}
