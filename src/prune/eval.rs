//! Expression walk over a split batch.
//!
//! ```text
//! filter_expr (dispatcher)
//!     ├─> Cmp      → SplitFilter over the batch
//!     ├─> Between  → (x >= low) then (x <= high)
//!     ├─> InList   → x = v1 OR x = v2 OR ... over what is still unmatched
//!     ├─> And      → right over the result of left
//!     ├─> Or       → left ∪ right over what left did not match
//!     └─> Opaque   → batch unchanged
//! ```
//!
//! Every rule returns a subset of its input without duplicates, so the result
//! of the whole walk is a subset of the batch handed to the pruner.

use std::collections::HashSet;

use super::{context::FilterContext, provider::IndexProvider};
use crate::{
    error::FilterError,
    expr::{CmpOp, Expr, LogicalOp},
    split::Split,
};

pub(crate) fn filter_expr<P: IndexProvider + ?Sized>(
    expr: &Expr,
    splits: &[Split],
    ctx: &FilterContext<'_, P>,
) -> Result<Vec<Split>, FilterError> {
    match expr {
        Expr::Cmp { column, op, value } => Ok(ctx.filter_cmp(column, *op, value, splits)),
        Expr::Between { column, low, high } => {
            let lower = ctx.filter_cmp(column, CmpOp::GtEq, low, splits);
            Ok(ctx.filter_cmp(column, CmpOp::LtEq, high, &lower))
        }
        Expr::InList { column, values } => {
            if values.is_empty() {
                return Ok(splits.to_vec());
            }
            let mut remaining = splits.to_vec();
            let mut matched = Vec::new();
            for value in values {
                if remaining.is_empty() {
                    break;
                }
                let hits = ctx.filter_cmp(column, CmpOp::Eq, value, &remaining);
                remove_all(&mut remaining, &hits);
                matched.extend(hits);
            }
            Ok(matched)
        }
        Expr::Logical { op, left, right } => match op {
            LogicalOp::And => {
                let left = filter_expr(left, splits, ctx)?;
                filter_expr(right, &left, ctx)
            }
            LogicalOp::Or => {
                let mut matched = filter_expr(left, splits, ctx)?;
                let mut remaining = splits.to_vec();
                remove_all(&mut remaining, &matched);
                let right = filter_expr(right, &remaining, ctx)?;
                matched.extend(right);
                Ok(matched)
            }
            LogicalOp::Eq
            | LogicalOp::NotEq
            | LogicalOp::IsDistinctFrom
            | LogicalOp::IsNotDistinctFrom => Err(FilterError::UnsupportedLogicalOperator {
                operator: op.symbol().to_string(),
            }),
        },
        Expr::Opaque(_) => Ok(splits.to_vec()),
    }
}

fn remove_all(splits: &mut Vec<Split>, matched: &[Split]) {
    if matched.is_empty() {
        return;
    }
    let matched: HashSet<&Split> = matched.iter().collect();
    splits.retain(|split| !matched.contains(split));
}
