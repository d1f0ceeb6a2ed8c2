//! Lowering of DataFusion logical predicates into [`Expr`](crate::Expr).
//!
//! Lowering never fails: anything that has no split-pruning meaning becomes
//! [`Expr::Opaque`](crate::Expr::Opaque), which keeps every split.

use datafusion_common::ScalarValue;
use datafusion_expr::{Between, BinaryExpr, Expr as DfExpr, Operator, expr::InList};

use crate::expr::{CmpOp, Expr as IrExpr, LogicalOp};

/// Lower a DataFusion predicate.
///
/// | DataFusion | IR |
/// |---|---|
/// | `col op lit`, `lit op col` | `Cmp` (operator flipped for `lit op col`) |
/// | `col BETWEEN lit AND lit` | `Between` |
/// | `col IN (lit, ...)` | `InList` |
/// | `a AND b`, `a OR b` | `Logical` |
/// | `a = b`, `a != b`, `a IS [NOT] DISTINCT FROM b` over two predicates | `Logical` |
/// | anything else, negated forms, casts over columns | `Opaque` |
///
/// # Example
/// ```
/// use datafusion_common::ScalarValue;
/// use datafusion_expr::{col, lit};
/// use split_prune::{Expr, compile_expr};
///
/// let expr = compile_expr(&lit(3i64).lt(col("nationkey")).and(col("name").eq(lit("CANADA"))));
/// assert_eq!(
///     expr,
///     Expr::and(
///         Expr::gt("nationkey", ScalarValue::Int64(Some(3))),
///         Expr::eq("name", ScalarValue::Utf8(Some("CANADA".to_string()))),
///     )
/// );
/// ```
pub fn compile_expr(expr: &DfExpr) -> IrExpr {
    match expr {
        DfExpr::Alias(alias) => compile_expr(&alias.expr),
        DfExpr::BinaryExpr(BinaryExpr { left, op, right }) => match op {
            Operator::And => IrExpr::and(compile_expr(left), compile_expr(right)),
            Operator::Or => IrExpr::or(compile_expr(left), compile_expr(right)),
            _ if is_predicate(left) && is_predicate(right) => match map_logical(*op) {
                Some(op) => IrExpr::logical(op, compile_expr(left), compile_expr(right)),
                None => opaque(expr),
            },
            _ => match extract_column_literal(left, right, *op) {
                Some((column, op, value)) => IrExpr::cmp(column, op, value),
                None => opaque(expr),
            },
        },
        DfExpr::Between(Between {
            expr: column_expr,
            negated: false,
            low,
            high,
        }) => match (
            extract_column(column_expr),
            extract_literal(low),
            extract_literal(high),
        ) {
            (Some(column), Some(low), Some(high)) => IrExpr::between(column, low, high),
            _ => opaque(expr),
        },
        DfExpr::InList(InList {
            expr: column_expr,
            list,
            negated: false,
        }) => {
            let Some(column) = extract_column(column_expr) else {
                return opaque(expr);
            };
            let values: Option<Vec<ScalarValue>> = list.iter().map(extract_literal).collect();
            match values {
                Some(values) => IrExpr::in_list(column, values),
                None => opaque(expr),
            }
        }
        _ => opaque(expr),
    }
}

fn opaque(expr: &DfExpr) -> IrExpr {
    IrExpr::opaque(expr.to_string())
}

/// Whether `expr` evaluates to a boolean per row.
fn is_predicate(expr: &DfExpr) -> bool {
    match expr {
        DfExpr::Alias(alias) => is_predicate(&alias.expr),
        DfExpr::BinaryExpr(BinaryExpr { op, .. }) => matches!(
            op,
            Operator::And
                | Operator::Or
                | Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::LtEq
                | Operator::Gt
                | Operator::GtEq
                | Operator::IsDistinctFrom
                | Operator::IsNotDistinctFrom
                | Operator::LikeMatch
                | Operator::NotLikeMatch
                | Operator::ILikeMatch
                | Operator::NotILikeMatch
                | Operator::RegexMatch
                | Operator::RegexIMatch
                | Operator::RegexNotMatch
                | Operator::RegexNotIMatch
        ),
        DfExpr::Between(_)
        | DfExpr::InList(_)
        | DfExpr::Like(_)
        | DfExpr::SimilarTo(_)
        | DfExpr::Not(_)
        | DfExpr::IsNull(_)
        | DfExpr::IsNotNull(_)
        | DfExpr::IsTrue(_)
        | DfExpr::IsFalse(_)
        | DfExpr::IsUnknown(_)
        | DfExpr::IsNotTrue(_)
        | DfExpr::IsNotFalse(_)
        | DfExpr::IsNotUnknown(_) => true,
        _ => false,
    }
}

fn extract_column(expr: &DfExpr) -> Option<String> {
    match expr {
        DfExpr::Column(col) => Some(col.name.clone()),
        DfExpr::Alias(alias) => extract_column(&alias.expr),
        _ => None,
    }
}

fn extract_literal(expr: &DfExpr) -> Option<ScalarValue> {
    match expr {
        DfExpr::Literal(value, _) => Some(value.clone()),
        DfExpr::Alias(alias) => extract_literal(&alias.expr),
        DfExpr::Cast(cast) => extract_literal(&cast.expr)?.cast_to(&cast.data_type).ok(),
        DfExpr::TryCast(cast) => extract_literal(&cast.expr)?.cast_to(&cast.data_type).ok(),
        _ => None,
    }
}

fn extract_column_literal(
    left: &DfExpr,
    right: &DfExpr,
    op: Operator,
) -> Option<(String, CmpOp, ScalarValue)> {
    let op = map_op(op)?;
    // column op literal
    if let (Some(column), Some(value)) = (extract_column(left), extract_literal(right)) {
        return Some((column, op, value));
    }
    // literal op column
    if let (Some(column), Some(value)) = (extract_column(right), extract_literal(left)) {
        return Some((column, op.flip(), value));
    }
    None
}

fn map_op(op: Operator) -> Option<CmpOp> {
    match op {
        Operator::Eq => Some(CmpOp::Eq),
        Operator::NotEq => Some(CmpOp::NotEq),
        Operator::Lt => Some(CmpOp::Lt),
        Operator::LtEq => Some(CmpOp::LtEq),
        Operator::Gt => Some(CmpOp::Gt),
        Operator::GtEq => Some(CmpOp::GtEq),
        _ => None,
    }
}

fn map_logical(op: Operator) -> Option<LogicalOp> {
    match op {
        Operator::And => Some(LogicalOp::And),
        Operator::Or => Some(LogicalOp::Or),
        Operator::Eq => Some(LogicalOp::Eq),
        Operator::NotEq => Some(LogicalOp::NotEq),
        Operator::IsDistinctFrom => Some(LogicalOp::IsDistinctFrom),
        Operator::IsNotDistinctFrom => Some(LogicalOp::IsNotDistinctFrom),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use datafusion_common::arrow::datatypes::DataType;
    use datafusion_expr::{cast, col, lit, not};

    use super::*;

    fn int(v: i64) -> ScalarValue {
        ScalarValue::Int64(Some(v))
    }

    #[test]
    fn compile_comparisons() {
        assert_eq!(compile_expr(&col("a").eq(lit(5i64))), IrExpr::eq("a", int(5)));
        assert_eq!(
            compile_expr(&col("a").not_eq(lit(5i64))),
            IrExpr::not_eq("a", int(5))
        );
        assert_eq!(compile_expr(&col("a").lt_eq(lit(5i64))), IrExpr::lt_eq("a", int(5)));
    }

    #[test]
    fn literal_on_the_left_flips_operator() {
        assert_eq!(compile_expr(&lit(5i64).lt(col("a"))), IrExpr::gt("a", int(5)));
        assert_eq!(compile_expr(&lit(5i64).gt_eq(col("a"))), IrExpr::lt_eq("a", int(5)));
        assert_eq!(compile_expr(&lit(5i64).eq(col("a"))), IrExpr::eq("a", int(5)));
    }

    #[test]
    fn compile_conjunction_and_disjunction() {
        let expr = col("a").eq(lit(5i64)).and(col("b").gt(lit(10i64)).or(col("c").is_null()));
        let ir = compile_expr(&expr);
        let IrExpr::Logical {
            op: LogicalOp::And,
            left,
            right,
        } = ir
        else {
            panic!("expected AND, got {ir:?}");
        };
        assert_eq!(*left, IrExpr::eq("a", int(5)));
        let IrExpr::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } = *right
        else {
            panic!("expected OR");
        };
        assert_eq!(*left, IrExpr::gt("b", int(10)));
        assert!(matches!(*right, IrExpr::Opaque(_)));
    }

    #[test]
    fn compile_between_and_in_list() {
        assert_eq!(
            compile_expr(&col("a").between(lit(1i64), lit(9i64))),
            IrExpr::between("a", int(1), int(9))
        );
        assert_eq!(
            compile_expr(&col("a").in_list(vec![lit(1i64), lit(2i64)], false)),
            IrExpr::in_list("a", vec![int(1), int(2)])
        );
    }

    #[test]
    fn negated_forms_are_opaque() {
        for expr in [
            col("a").not_between(lit(1i64), lit(9i64)),
            col("a").in_list(vec![lit(1i64)], true),
            not(col("a").eq(lit(1i64))),
        ] {
            assert!(matches!(compile_expr(&expr), IrExpr::Opaque(_)), "{expr}");
        }
    }

    #[test]
    fn non_literal_operands_are_opaque() {
        for expr in [
            col("a").eq(col("b")),
            col("a").in_list(vec![lit(1i64), col("b")], false),
            col("a").between(col("b"), lit(9i64)),
            col("a").like(lit("x%")),
            cast(col("a"), DataType::Utf8).eq(lit("1")),
        ] {
            assert!(matches!(compile_expr(&expr), IrExpr::Opaque(_)), "{expr}");
        }
    }

    #[test]
    fn comparison_between_predicates_is_logical() {
        let expr = col("a").eq(lit(1i64)).eq(col("b").eq(lit(2i64)));
        assert_eq!(
            compile_expr(&expr),
            IrExpr::logical(
                LogicalOp::Eq,
                IrExpr::eq("a", int(1)),
                IrExpr::eq("b", int(2))
            )
        );

        let expr = DfExpr::BinaryExpr(BinaryExpr::new(
            Box::new(col("a").eq(lit(1i64))),
            Operator::IsDistinctFrom,
            Box::new(col("b").eq(lit(2i64))),
        ));
        assert!(matches!(
            compile_expr(&expr),
            IrExpr::Logical {
                op: LogicalOp::IsDistinctFrom,
                ..
            }
        ));
    }

    #[test]
    fn aliases_and_literal_casts_are_unwrapped() {
        let expr = col("a")
            .alias("x")
            .eq(cast(lit(5i32), DataType::Int64))
            .alias("p");
        assert_eq!(compile_expr(&expr), IrExpr::eq("a", int(5)));
    }
}
