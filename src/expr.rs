use datafusion_common::ScalarValue;

/// Outcome of asking the resident indexes whether a split can hold a value.
///
/// `Unknown` covers every case where no index could decide (none loaded,
/// operator unsupported, value type unsupported); such splits are kept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    /// Combine the answers of two indexes covering the same split.
    pub(crate) fn or(self, other: Self) -> Self {
        match (self, other) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Unknown,
        }
    }
}

/// Comparison operator of a `column op value` leaf.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    /// Operator to use when the operands of a comparison are swapped.
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::NotEq => CmpOp::NotEq,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtEq => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtEq => CmpOp::LtEq,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }
}

/// Operator joining two boolean sub-expressions.
///
/// Only `And` and `Or` can be combined over split sets. The remaining
/// operators are produced by planners for predicates such as
/// `(a = 1) IS DISTINCT FROM (b = 2)` and are rejected by the pruner.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    Eq,
    NotEq,
    IsDistinctFrom,
    IsNotDistinctFrom,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Eq => "=",
            LogicalOp::NotEq => "!=",
            LogicalOp::IsDistinctFrom => "IS DISTINCT FROM",
            LogicalOp::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
        }
    }
}

/// Predicate tree handed over by the query planner.
///
/// Column names are planner symbols; they are resolved to table columns
/// through the assignments passed to [`SplitPruner::filter`](crate::SplitPruner::filter).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Cmp {
        column: String,
        op: CmpOp,
        value: ScalarValue,
    },
    /// Inclusive range `column BETWEEN low AND high`.
    Between {
        column: String,
        low: ScalarValue,
        high: ScalarValue,
    },
    InList {
        column: String,
        values: Vec<ScalarValue>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Anything the pruner cannot use. Carries a description for logging.
    Opaque(String),
}

impl Expr {
    /// Build a comparison expression with an explicit operator.
    pub fn cmp(column: impl Into<String>, op: CmpOp, value: ScalarValue) -> Self {
        Expr::Cmp {
            column: column.into(),
            op,
            value,
        }
    }

    /// Build an equality expression (`=`).
    pub fn eq(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::Eq, value)
    }

    /// Build a not-equal expression (`!=`).
    pub fn not_eq(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::NotEq, value)
    }

    /// Build a less-than expression (`<`).
    pub fn lt(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::Lt, value)
    }

    /// Build a less-than-or-equal expression (`<=`).
    pub fn lt_eq(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::LtEq, value)
    }

    /// Build a greater-than expression (`>`).
    pub fn gt(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::Gt, value)
    }

    /// Build a greater-than-or-equal expression (`>=`).
    pub fn gt_eq(column: impl Into<String>, value: ScalarValue) -> Self {
        Self::cmp(column, CmpOp::GtEq, value)
    }

    /// Build an inclusive BETWEEN expression.
    pub fn between(column: impl Into<String>, low: ScalarValue, high: ScalarValue) -> Self {
        Expr::Between {
            column: column.into(),
            low,
            high,
        }
    }

    /// Build an IN (...) expression.
    pub fn in_list(column: impl Into<String>, values: Vec<ScalarValue>) -> Self {
        Expr::InList {
            column: column.into(),
            values,
        }
    }

    /// Build a binary logical expression.
    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build an AND expression.
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::logical(LogicalOp::And, left, right)
    }

    /// Build an OR expression.
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::logical(LogicalOp::Or, left, right)
    }

    pub fn opaque(description: impl Into<String>) -> Self {
        Expr::Opaque(description.into())
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Cmp { column, op, value } => {
                write!(f, "{} {} {:?}", column, op.symbol(), value)
            }
            Expr::Between { column, low, high } => {
                write!(f, "{} BETWEEN {:?} AND {:?}", column, low, high)
            }
            Expr::InList { column, values } => {
                write!(f, "{} IN (", column)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", v)?;
                }
                write!(f, ")")
            }
            Expr::Logical { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Opaque(description) => write!(f, "<{}>", description),
        }
    }
}
