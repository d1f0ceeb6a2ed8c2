use std::sync::Arc;

use crate::{cache::IndexCache, index::IndexMetadata, split::Split};

/// Source of resident index metadata for a split.
///
/// [`IndexCache`] is the production implementation. Implementations must not
/// block: return whatever is available now and nothing for the rest.
///
/// # Example
///
/// ```
/// use split_prune::{IndexMetadata, IndexProvider, Split};
///
/// /// Provider that knows no indexes, so every split is kept.
/// struct NoIndexes;
///
/// impl IndexProvider for NoIndexes {
///     fn indices(
///         &self,
///         _table_fqn: &str,
///         _split: &Split,
///         _predicate_columns: &[String],
///         _partition_columns: &[String],
///     ) -> Vec<IndexMetadata> {
///         Vec::new()
///     }
/// }
/// ```
pub trait IndexProvider: Send + Sync {
    /// Indexes over `split` for the given predicate columns.
    ///
    /// Partition columns are never indexed and must be skipped.
    fn indices(
        &self,
        table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata>;

    /// Whether the provider can return anything at all.
    ///
    /// A disabled provider lets callers skip expression evaluation.
    fn is_enabled(&self) -> bool {
        true
    }
}

impl IndexProvider for IndexCache {
    fn indices(
        &self,
        table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata> {
        self.get_indices(table_fqn, split, predicate_columns, partition_columns)
    }

    fn is_enabled(&self) -> bool {
        IndexCache::is_enabled(self)
    }
}

impl<P: IndexProvider + ?Sized> IndexProvider for Arc<P> {
    fn indices(
        &self,
        table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata> {
        (**self).indices(table_fqn, split, predicate_columns, partition_columns)
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}

impl<P: IndexProvider + ?Sized> IndexProvider for &P {
    fn indices(
        &self,
        table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata> {
        (**self).indices(table_fqn, split, predicate_columns, partition_columns)
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}
