use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters of a [`SplitPruner`](crate::SplitPruner).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Splits handed to the pruner with an expression to evaluate
    pub splits_processed: u64,
    /// Splits removed from those batches
    pub splits_pruned: u64,
}

#[derive(Debug, Default)]
pub(crate) struct FilterCounters {
    processed: AtomicU64,
    pruned: AtomicU64,
}

impl FilterCounters {
    pub(crate) fn record(&self, input: usize, output: usize) {
        self.processed.fetch_add(input as u64, Ordering::Relaxed);
        self.pruned
            .fetch_add(input.saturating_sub(output) as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> FilterStats {
        FilterStats {
            splits_processed: self.processed.load(Ordering::Relaxed),
            splits_pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_batches() {
        let counters = FilterCounters::default();
        counters.record(10, 4);
        counters.record(5, 5);
        assert_eq!(
            counters.snapshot(),
            FilterStats {
                splits_processed: 15,
                splits_pruned: 6,
            }
        );
    }
}
