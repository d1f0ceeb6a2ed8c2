use tracing::warn;

use super::{predicate::Assignments, provider::IndexProvider, result::FilterResult};
use crate::{expr::Expr, pruner::SplitPruner, split::Split};

/// Builder for filtering one batch of splits.
///
/// Unlike [`SplitPruner::filter`], a request never fails: a missing predicate
/// or table, a disabled pruner, or an expression the pruner rejects all
/// return the batch unchanged.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use datafusion_common::ScalarValue;
/// use split_prune::{Assignments, ColumnHandle, Expr, FilterRequest, IndexCache, Split, SplitPruner};
///
/// # fn example(cache: Arc<IndexCache>, splits: Vec<Split>) {
/// let pruner = SplitPruner::new(cache);
/// let expr = Expr::eq("nationkey_0", ScalarValue::Int64(Some(3)));
/// let assignments = Assignments::from([(
///     "nationkey_0".to_string(),
///     ColumnHandle::new("nationkey"),
/// )]);
///
/// let result = FilterRequest::new(&splits)
///     .with_predicate(&expr)
///     .with_table("hive.tpch.nation")
///     .with_assignments(&assignments)
///     .filter(&pruner);
///
/// println!("Scan {} of {} splits", result.splits().len(), result.input_count());
/// # }
/// ```
#[derive(Debug)]
pub struct FilterRequest<'a> {
    splits: &'a [Split],
    expr: Option<&'a Expr>,
    table_fqn: Option<&'a str>,
    assignments: Option<&'a Assignments>,
}

impl<'a> FilterRequest<'a> {
    pub fn new(splits: &'a [Split]) -> Self {
        Self {
            splits,
            expr: None,
            table_fqn: None,
            assignments: None,
        }
    }

    /// Sets the filter predicate to evaluate.
    pub fn with_predicate(mut self, expr: &'a Expr) -> Self {
        self.expr = Some(expr);
        self
    }

    /// Sets the fully qualified table name (`catalog.schema.table`).
    pub fn with_table(mut self, table_fqn: &'a str) -> Self {
        self.table_fqn = Some(table_fqn);
        self
    }

    /// Sets the planner symbol to column bindings. Without them no leaf can
    /// be mapped and every split is kept.
    pub fn with_assignments(mut self, assignments: &'a Assignments) -> Self {
        self.assignments = Some(assignments);
        self
    }

    /// Execute the request.
    pub fn filter<P: IndexProvider>(self, pruner: &SplitPruner<P>) -> FilterResult {
        let input_count = self.splits.len();
        let unchanged = || FilterResult::new(self.splits.to_vec(), input_count);

        let (Some(expr), Some(table_fqn)) = (self.expr, self.table_fqn) else {
            return unchanged();
        };
        if table_fqn.is_empty() || !pruner.is_enabled() {
            return unchanged();
        }

        let empty = Assignments::new();
        let assignments = self.assignments.unwrap_or(&empty);
        match pruner.filter(expr, table_fqn, self.splits, assignments) {
            Ok(splits) => FilterResult::new(splits, input_count),
            Err(error) => {
                warn!(table = table_fqn, %expr, %error, "Split filtering failed, scanning all splits");
                unchanged()
            }
        }
    }
}
