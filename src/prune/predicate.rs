use std::{collections::HashMap, fmt};

use datafusion_common::ScalarValue;

use crate::expr::CmpOp;

/// Table column a planner symbol is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnHandle {
    name: String,
    partition_key: bool,
}

impl ColumnHandle {
    /// A regular data column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: false,
        }
    }

    /// A partition column. These are pruned by the planner and never indexed.
    pub fn partition(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_partition_key(&self) -> bool {
        self.partition_key
    }
}

/// Planner symbol → table column.
pub type Assignments = HashMap<String, ColumnHandle>;

/// Names of the partition columns among `assignments`.
pub(crate) fn partition_columns(assignments: &Assignments) -> Vec<String> {
    assignments
        .values()
        .filter(|handle| handle.is_partition_key())
        .map(|handle| handle.name().to_lowercase())
        .collect()
}

/// A single `column op value` test against one table column.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    table: String,
    column: String,
    op: CmpOp,
    value: ScalarValue,
}

impl Predicate {
    pub fn new(
        table: impl Into<String>,
        column: impl AsRef<str>,
        op: CmpOp,
        value: ScalarValue,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.as_ref().to_lowercase(),
            op,
            value,
        }
    }

    /// Resolve a comparison leaf through the planner's assignments.
    ///
    /// Returns `None` when the symbol is not assigned or the value is null;
    /// neither can be answered by an index.
    pub fn resolve(
        table_fqn: &str,
        symbol: &str,
        op: CmpOp,
        value: &ScalarValue,
        assignments: &Assignments,
    ) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        let handle = assignments.get(symbol)?;
        Some(Self::new(table_fqn, handle.name(), op, value.clone()))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Lowercased column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn value(&self) -> &ScalarValue {
        &self.value
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.table,
            self.column,
            self.op.symbol(),
            self.value
        )
    }
}
