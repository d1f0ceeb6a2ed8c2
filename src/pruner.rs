#[cfg(feature = "datafusion")]
use datafusion_expr::Expr as DfExpr;
use tracing::debug;

#[cfg(feature = "datafusion")]
use crate::compile::compile_expr;
use crate::{
    error::FilterError,
    expr::Expr,
    prune::{Assignments, FilterContext, FilterCounters, FilterStats, IndexProvider, filter_expr},
    split::Split,
};

/// Reusable split pruning façade over an [`IndexProvider`].
///
/// Evaluates planner expressions against the indexes the provider has
/// resident and keeps cumulative [`FilterStats`].
///
/// # Thread Safety
///
/// `SplitPruner` is `Send + Sync` whenever its provider is, and all methods
/// take `&self`. Share one instance (or one [`IndexCache`](crate::IndexCache))
/// across planning threads.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use datafusion_common::ScalarValue;
/// use split_prune::{
///     Assignments, ColumnHandle, Expr, FilterConfig, IndexCache, IndexLoader, Split, SplitPruner,
/// };
///
/// # fn example(loader: Arc<dyn IndexLoader>, splits: Vec<Split>) -> Result<(), Box<dyn std::error::Error>> {
/// let cache = Arc::new(IndexCache::new(&FilterConfig::enabled(), loader)?);
/// let pruner = SplitPruner::new(Arc::clone(&cache));
///
/// let assignments = Assignments::from([
///     ("nationkey".to_string(), ColumnHandle::new("nationkey")),
///     ("name".to_string(), ColumnHandle::new("name")),
/// ]);
/// let expr = Expr::and(
///     Expr::eq("nationkey", ScalarValue::Int64(Some(3))),
///     Expr::eq("name", ScalarValue::Utf8(Some("CANADA".to_string()))),
/// );
///
/// let kept = pruner.filter(&expr, "hive.tpch.nation", &splits, &assignments)?;
/// println!("Scan {} of {} splits", kept.len(), splits.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SplitPruner<P> {
    provider: P,
    counters: FilterCounters,
}

impl<P: IndexProvider> SplitPruner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            counters: FilterCounters::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether the provider can return indexes. A disabled pruner keeps
    /// every split.
    pub fn is_enabled(&self) -> bool {
        self.provider.is_enabled()
    }

    /// Splits of `table_fqn` that may contain rows matching `expr`.
    ///
    /// The result is a subset of `splits` without duplicates. Splits whose
    /// indexes are not resident yet are kept.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnsupportedLogicalOperator`] when a logical node
    /// joins its operands with anything but `AND` / `OR`, whatever the size
    /// of `splits`.
    pub fn filter(
        &self,
        expr: &Expr,
        table_fqn: &str,
        splits: &[Split],
        assignments: &Assignments,
    ) -> Result<Vec<Split>, FilterError> {
        if !self.is_enabled() {
            return Ok(splits.to_vec());
        }

        let ctx = FilterContext::new(&self.provider, table_fqn, assignments);
        let kept = filter_expr(expr, splits, &ctx)?;

        self.counters.record(splits.len(), kept.len());
        let stats = self.counters.snapshot();
        debug!(
            table = table_fqn,
            input = splits.len(),
            kept = kept.len(),
            total_processed = stats.splits_processed,
            total_pruned = stats.splits_pruned,
            "Filtered splits"
        );
        Ok(kept)
    }

    /// Lower a DataFusion predicate with [`compile_expr`] and filter with it.
    ///
    /// Column names of the DataFusion expression are looked up in
    /// `assignments` like planner symbols.
    #[cfg(feature = "datafusion")]
    pub fn filter_datafusion(
        &self,
        expr: &DfExpr,
        table_fqn: &str,
        splits: &[Split],
        assignments: &Assignments,
    ) -> Result<Vec<Split>, FilterError> {
        self.filter(&compile_expr(expr), table_fqn, splits, assignments)
    }

    /// Cumulative counters across all successful [`filter`](Self::filter) calls.
    pub fn stats(&self) -> FilterStats {
        self.counters.snapshot()
    }
}
