#![allow(dead_code)]

use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeSet, HashMap},
    io::{Read, Write},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use datafusion_common::ScalarValue;
use futures_util::{FutureExt, future::BoxFuture};
use split_prune::{
    Assignments, CmpOp, ColumnHandle, DEFAULT_INDEX_KINDS, Index, IndexCacheKey, IndexError,
    IndexKind, IndexLoader, IndexMetadata, IndexProvider, LoadError, Split,
};

pub const NATION: &str = "hive.tpch.nation";
pub const LAST_MODIFIED: i64 = 1_700_000_000_000;

// ============================================================================
// Index
// ============================================================================

/// Index holding the exact values of a stripe. Answers every operator for
/// values comparable with what it holds.
#[derive(Debug, Default)]
pub struct SetIndex {
    values: Vec<ScalarValue>,
}

impl SetIndex {
    pub fn new(values: impl IntoIterator<Item = ScalarValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl Index for SetIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Bitmap
    }

    fn add_values(&mut self, values: &[ScalarValue]) -> Result<(), IndexError> {
        self.values.extend(values.iter().cloned());
        Ok(())
    }

    fn matches(&self, value: &ScalarValue, op: CmpOp) -> Result<bool, IndexError> {
        let mut result = false;
        for stored in &self.values {
            let ordering = stored
                .partial_cmp(value)
                .ok_or_else(|| IndexError::UnsupportedValue {
                    kind: "set".to_string(),
                    value_type: value.data_type().to_string(),
                })?;
            result |= match op {
                CmpOp::Eq => ordering == CmpOrdering::Equal,
                CmpOp::NotEq => ordering != CmpOrdering::Equal,
                CmpOp::Lt => ordering == CmpOrdering::Less,
                CmpOp::LtEq => ordering != CmpOrdering::Greater,
                CmpOp::Gt => ordering == CmpOrdering::Greater,
                CmpOp::GtEq => ordering != CmpOrdering::Less,
            };
        }
        Ok(result)
    }

    fn supports(&self, _op: CmpOp) -> bool {
        true
    }

    fn persist(&self, _out: &mut dyn Write) -> Result<(), IndexError> {
        Ok(())
    }

    fn load(&mut self, _input: &mut dyn Read) -> Result<(), IndexError> {
        Ok(())
    }

    fn expected_entries(&self) -> usize {
        self.values.len()
    }

    fn set_expected_entries(&mut self, _n: usize) {}
}

pub fn set_metadata(
    table: &str,
    column: &str,
    split: &Split,
    values: impl IntoIterator<Item = ScalarValue>,
) -> IndexMetadata {
    IndexMetadata::new(
        Arc::new(SetIndex::new(values)),
        table,
        column,
        "/indexes",
        key_for(table, column, split).path(),
        split.start(),
        split.last_modified(),
    )
}

// ============================================================================
// Providers
// ============================================================================

/// Provider with a fixed set of indexes, keyed by split path and column.
#[derive(Default)]
pub struct StaticProvider {
    indexes: HashMap<(String, String), Vec<IndexMetadata>>,
}

impl StaticProvider {
    pub fn with(mut self, split: &Split, column: &str, values: &[ScalarValue]) -> Self {
        self.insert(split, column, values);
        self
    }

    pub fn insert(&mut self, split: &Split, column: &str, values: &[ScalarValue]) {
        self.indexes
            .entry((split.path().to_string(), column.to_lowercase()))
            .or_default()
            .push(set_metadata(NATION, column, split, values.iter().cloned()));
    }
}

impl IndexProvider for StaticProvider {
    fn indices(
        &self,
        _table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata> {
        predicate_columns
            .iter()
            .filter(|c| !partition_columns.iter().any(|p| p.eq_ignore_ascii_case(c)))
            .filter_map(|c| self.indexes.get(&(split.path().to_string(), c.to_lowercase())))
            .flatten()
            .cloned()
            .collect()
    }
}

/// Loader serving indexes from memory and counting calls.
#[derive(Default)]
pub struct MemoryLoader {
    indexes: HashMap<String, Vec<IndexMetadata>>,
    calls: AtomicUsize,
}

impl MemoryLoader {
    /// Index `column` of `split` with `values`, built for the split's
    /// current last-modified time.
    pub fn with_index(self, split: &Split, column: &str, values: &[ScalarValue]) -> Self {
        let metadata = set_metadata(NATION, column, split, values.iter().cloned());
        self.with_metadata(key_for(NATION, column, split), metadata)
    }

    pub fn with_metadata(mut self, key: IndexCacheKey, metadata: IndexMetadata) -> Self {
        self.indexes
            .entry(key.path().to_string())
            .or_default()
            .push(metadata);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IndexLoader for MemoryLoader {
    fn load(&self, key: &IndexCacheKey) -> BoxFuture<'_, Result<Vec<IndexMetadata>, LoadError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let indexes = self.indexes.get(key.path()).cloned().unwrap_or_default();
        async move { Ok(indexes) }.boxed()
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn key_for(table: &str, column: &str, split: &Split) -> IndexCacheKey {
    IndexCacheKey::for_column(
        table,
        column,
        split.file_path(),
        split.last_modified(),
        DEFAULT_INDEX_KINDS,
    )
}

pub fn nation_splits(count: usize) -> Vec<Split> {
    (0..count)
        .map(|i| {
            Split::new(
                "hive",
                format!("hdfs://nn:8020/warehouse/tpch/nation/{i:06}_0"),
                0,
                4096,
                LAST_MODIFIED,
            )
        })
        .collect()
}

pub fn assignments(columns: &[&str]) -> Assignments {
    columns
        .iter()
        .map(|c| (c.to_string(), ColumnHandle::new(*c)))
        .collect()
}

pub fn int(v: i64) -> ScalarValue {
    ScalarValue::Int64(Some(v))
}

pub fn utf8(v: &str) -> ScalarValue {
    ScalarValue::Utf8(Some(v.to_string()))
}

/// Positions in `all` of the splits in `kept`.
pub fn positions(all: &[Split], kept: &[Split]) -> BTreeSet<usize> {
    kept.iter()
        .map(|split| {
            all.iter()
                .position(|candidate| candidate == split)
                .expect("kept split not in input")
        })
        .collect()
}

pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
