use std::slice;

use tracing::{debug, trace};

use super::{predicate::Predicate, provider::IndexProvider};
use crate::{expr::TriState, index::IndexMetadata, split::Split};

/// Applies one [`Predicate`] to a batch of splits using resident indexes.
///
/// A split is dropped only when every index covering it proves the value
/// absent. Missing indexes, unsupported operators and index errors all keep
/// the split.
pub struct SplitFilter<'a, P: ?Sized> {
    provider: &'a P,
    partition_columns: &'a [String],
}

impl<'a, P: IndexProvider + ?Sized> SplitFilter<'a, P> {
    pub fn new(provider: &'a P, partition_columns: &'a [String]) -> Self {
        Self {
            provider,
            partition_columns,
        }
    }

    /// Splits that may contain rows matching `predicate`, in input order.
    pub fn filter<'s>(
        &self,
        predicate: &Predicate,
        splits: impl IntoIterator<Item = &'s Split>,
    ) -> Vec<Split> {
        splits
            .into_iter()
            .filter(|split| self.evaluate(predicate, split) != TriState::False)
            .cloned()
            .collect()
    }

    /// What the indexes covering `split` say about `predicate`.
    pub fn evaluate(&self, predicate: &Predicate, split: &Split) -> TriState {
        let indexes = self.provider.indices(
            predicate.table(),
            split,
            slice::from_ref(&predicate.column().to_string()),
            self.partition_columns,
        );

        let mut result = TriState::False;
        let mut applicable = 0usize;
        for metadata in indexes.iter().filter(|m| applies(m, predicate, split)) {
            applicable += 1;
            result = result.or(evaluate_index(metadata, predicate));
            if result == TriState::True {
                break;
            }
        }

        if applicable == 0 {
            trace!(split = %split.key(), %predicate, "No index for split");
            return TriState::Unknown;
        }
        result
    }
}

/// Index built over the predicate's column for a stripe inside `split`.
fn applies(metadata: &IndexMetadata, predicate: &Predicate, split: &Split) -> bool {
    split.covers(metadata.split_start())
        && metadata.column().eq_ignore_ascii_case(predicate.column())
}

fn evaluate_index(metadata: &IndexMetadata, predicate: &Predicate) -> TriState {
    let index = metadata.index();
    if !index.supports(predicate.op()) {
        trace!(
            kind = %index.kind(),
            op = predicate.op().symbol(),
            "Index does not support operator"
        );
        return TriState::Unknown;
    }
    match index.matches(predicate.value(), predicate.op()) {
        Ok(true) => TriState::True,
        Ok(false) => TriState::False,
        Err(error) => {
            debug!(uri = metadata.uri(), %predicate, %error, "Index lookup failed");
            TriState::Unknown
        }
    }
}
