use datafusion_common::ScalarValue;
use tracing::trace;

use super::{
    predicate::{Assignments, Predicate, partition_columns},
    provider::IndexProvider,
    split_filter::SplitFilter,
};
use crate::{expr::CmpOp, split::Split};

/// Inputs shared by every node of one expression walk.
pub(crate) struct FilterContext<'a, P: ?Sized> {
    pub(crate) provider: &'a P,
    pub(crate) table_fqn: &'a str,
    pub(crate) assignments: &'a Assignments,
    pub(crate) partition_columns: Vec<String>,
}

impl<'a, P: IndexProvider + ?Sized> FilterContext<'a, P> {
    pub(crate) fn new(provider: &'a P, table_fqn: &'a str, assignments: &'a Assignments) -> Self {
        Self {
            provider,
            table_fqn,
            assignments,
            partition_columns: partition_columns(assignments),
        }
    }

    /// Apply `column op value` to `splits`, or return them all when the leaf
    /// cannot be mapped to an indexed column.
    pub(crate) fn filter_cmp<'s>(
        &self,
        column: &str,
        op: CmpOp,
        value: &ScalarValue,
        splits: impl IntoIterator<Item = &'s Split>,
    ) -> Vec<Split> {
        match Predicate::resolve(self.table_fqn, column, op, value, self.assignments) {
            Some(predicate) => {
                SplitFilter::new(self.provider, &self.partition_columns).filter(&predicate, splits)
            }
            None => {
                trace!(column, op = op.symbol(), "Predicate not mappable to an indexed column");
                splits.into_iter().cloned().collect()
            }
        }
    }
}
