mod context;
mod eval;
mod predicate;
mod provider;
mod request;
mod result;
mod split_filter;
mod stats;

pub(crate) use context::FilterContext;
pub(crate) use eval::filter_expr;
pub use predicate::{Assignments, ColumnHandle, Predicate};
pub use provider::IndexProvider;
pub use request::FilterRequest;
pub use result::FilterResult;
pub use split_filter::SplitFilter;
pub(crate) use stats::FilterCounters;
pub use stats::FilterStats;
