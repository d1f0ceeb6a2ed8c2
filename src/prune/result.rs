use crate::split::Split;

/// Outcome of a [`FilterRequest`](super::FilterRequest).
#[derive(Clone, Debug)]
pub struct FilterResult {
    splits: Vec<Split>,
    input_count: usize,
}

impl FilterResult {
    pub(super) fn new(splits: Vec<Split>, input_count: usize) -> Self {
        Self {
            splits,
            input_count,
        }
    }

    /// Splits to scan
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Number of splits in the request
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Number of splits removed
    pub fn pruned_count(&self) -> usize {
        self.input_count.saturating_sub(self.splits.len())
    }

    pub fn into_splits(self) -> Vec<Split> {
        self.splits
    }
}
