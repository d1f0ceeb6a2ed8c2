//! Index-driven split pruning for distributed scans.
//!
//! A scan is broken into [`Split`]s, byte ranges of data files. When secondary
//! indexes (bitmap, bloom) exist for a file's stripes, a planner predicate can
//! prove that some splits hold no matching rows. This crate removes those
//! splits before they are scheduled, without ever blocking planning on index
//! I/O:
//!
//! - [`IndexCache`] keeps recently used index metadata in memory and loads
//!   missing entries in the background through an [`IndexLoader`].
//! - [`SplitPruner`] walks an [`Expr`] and keeps every split that may match.
//!   Splits whose indexes are not resident yet are always kept.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use datafusion_common::ScalarValue;
//! use split_prune::{
//!     Assignments, ColumnHandle, Expr, FilterConfig, FilterRequest, IndexCache, IndexLoader,
//!     Split, SplitPruner,
//! };
//!
//! # fn example(loader: Arc<dyn IndexLoader>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = FilterConfig::from_properties([
//!     ("filter.enabled", "true"),
//!     ("filter.cache.loading-delay", "2s"),
//! ])?;
//! let pruner = SplitPruner::new(Arc::new(IndexCache::new(&config, loader)?));
//!
//! let splits = vec![
//!     Split::new("hive", "hdfs://nn/warehouse/nation/000000_0", 0, 4096, 1_700_000_000_000),
//!     Split::new("hive", "hdfs://nn/warehouse/nation/000001_0", 0, 4096, 1_700_000_000_000),
//! ];
//! let assignments = Assignments::from([(
//!     "nationkey".to_string(),
//!     ColumnHandle::new("nationkey"),
//! )]);
//! let expr = Expr::in_list(
//!     "nationkey",
//!     vec![ScalarValue::Int64(Some(3)), ScalarValue::Int64(Some(9))],
//! );
//!
//! let result = FilterRequest::new(&splits)
//!     .with_predicate(&expr)
//!     .with_table("hive.tpch.nation")
//!     .with_assignments(&assignments)
//!     .filter(&pruner);
//! println!("Pruned {} splits", result.pruned_count());
//! # Ok(())
//! # }
//! ```

mod cache;
#[cfg(feature = "datafusion")]
mod compile;
mod config;
mod error;
mod expr;
mod index;
mod prune;
mod pruner;
mod split;

pub use cache::{DEFAULT_INDEX_KINDS, IndexCache, IndexCacheKey, IndexLoader};
#[cfg(feature = "datafusion")]
pub use compile::compile_expr;
pub use config::{CacheConfig, FilterConfig};
pub use error::{ConfigError, FilterError, IndexError, LoadError};
pub use expr::{CmpOp, Expr, LogicalOp, TriState};
pub use index::{BitmapIndex, BloomIndex, Index, IndexKind, IndexMetadata};
pub use prune::{
    Assignments, ColumnHandle, FilterRequest, FilterResult, FilterStats, IndexProvider, Predicate,
    SplitFilter,
};
pub use pruner::SplitPruner;
pub use split::Split;
