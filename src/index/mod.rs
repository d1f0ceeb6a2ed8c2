//! Per-column index capability and the metadata that ties a loaded index to
//! the file it summarises.
//!
//! # Value encoding
//!
//! The bundled kinds hash a canonical byte encoding of each value, so that a
//! literal typed differently from the indexed column still finds its match:
//!
//! - every integer type, and floats with an integral value, encode as `i64`
//!   (`u64` above `i64::MAX`);
//! - other `Float64` values encode as `f64`; a non-integral `Float32` has no
//!   encoding, since widening it does not reproduce the `f64` literal;
//! - `Utf8`, `LargeUtf8` and `Utf8View` share one encoding, as do the binary types;
//! - `Date64` with a whole number of days encodes like `Date32`;
//! - timestamps encode as nanoseconds since the epoch, ignoring the time zone.
//!
//! Nulls, decimals, times, durations and nested values have no encoding. An
//! index refuses them with [`IndexError::UnsupportedValue`], and the split is
//! kept.

mod bitmap;
mod bloom;

use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
    sync::Arc,
};

pub use bitmap::BitmapIndex;
pub use bloom::BloomIndex;
use datafusion_common::ScalarValue;

use crate::{error::IndexError, expr::CmpOp};

/// Precomputed summary of one column over one stripe of a data file.
pub trait Index: Send + Sync + fmt::Debug {
    fn kind(&self) -> IndexKind;

    /// Add column values to the index. Nulls are skipped.
    fn add_values(&mut self, values: &[ScalarValue]) -> Result<(), IndexError>;

    /// Whether the indexed data may contain a row satisfying `column op value`.
    ///
    /// `false` must only be returned when no such row exists.
    fn matches(&self, value: &ScalarValue, op: CmpOp) -> Result<bool, IndexError>;

    fn supports(&self, op: CmpOp) -> bool;

    fn persist(&self, out: &mut dyn Write) -> Result<(), IndexError>;

    /// Replace the content of this index with data written by [`persist`](Self::persist).
    fn load(&mut self, input: &mut dyn Read) -> Result<(), IndexError>;

    fn expected_entries(&self) -> usize;

    fn set_expected_entries(&mut self, expected_entries: usize);
}

/// Tag naming an index implementation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum IndexKind {
    Bitmap,
    Bloom,
}

impl IndexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Bitmap => "bitmap",
            IndexKind::Bloom => "bloom",
        }
    }

    /// Create an empty index of this kind, ready for `add_values` or `load`.
    pub fn new_index(self) -> Box<dyn Index> {
        match self {
            IndexKind::Bitmap => Box::new(BitmapIndex::new()),
            IndexKind::Bloom => Box::new(BloomIndex::new()),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitmap" => Ok(IndexKind::Bitmap),
            "bloom" => Ok(IndexKind::Bloom),
            other => Err(IndexError::Malformed {
                kind: other.to_string(),
                reason: "unknown index kind".to_string(),
            }),
        }
    }
}

/// A loaded index and where it came from.
#[derive(Clone, Debug)]
pub struct IndexMetadata {
    index: Arc<dyn Index>,
    table: String,
    column: String,
    root_uri: String,
    uri: String,
    split_start: u64,
    last_updated: i64,
}

impl IndexMetadata {
    pub fn new(
        index: Arc<dyn Index>,
        table: impl Into<String>,
        column: impl Into<String>,
        root_uri: impl Into<String>,
        uri: impl Into<String>,
        split_start: u64,
        last_updated: i64,
    ) -> Self {
        Self {
            index,
            table: table.into(),
            column: column.into(),
            root_uri: root_uri.into(),
            uri: uri.into(),
            split_start,
            last_updated,
        }
    }

    pub fn index(&self) -> &Arc<dyn Index> {
        &self.index
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Root of the index store the index was read from.
    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Byte offset of the stripe this index summarises.
    pub fn split_start(&self) -> u64 {
        self.split_start
    }

    /// Last-modified time of the source file when the index was built.
    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }
}

const TAG_INT: u8 = b'i';
const TAG_UINT: u8 = b'u';
const TAG_FLOAT: u8 = b'f';
const TAG_BOOL: u8 = b'z';
const TAG_STR: u8 = b's';
const TAG_BIN: u8 = b'b';
const TAG_DATE: u8 = b'd';
const TAG_TIMESTAMP: u8 = b't';

const MILLIS_PER_DAY: i64 = 86_400_000;

pub(crate) fn canonical_bytes(value: &ScalarValue) -> Option<Vec<u8>> {
    let encoded = match value {
        ScalarValue::Boolean(Some(v)) => tagged(TAG_BOOL, &[*v as u8]),
        ScalarValue::Int8(Some(v)) => int(*v as i64),
        ScalarValue::Int16(Some(v)) => int(*v as i64),
        ScalarValue::Int32(Some(v)) => int(*v as i64),
        ScalarValue::Int64(Some(v)) => int(*v),
        ScalarValue::UInt8(Some(v)) => int(*v as i64),
        ScalarValue::UInt16(Some(v)) => int(*v as i64),
        ScalarValue::UInt32(Some(v)) => int(*v as i64),
        ScalarValue::UInt64(Some(v)) => match i64::try_from(*v) {
            Ok(v) => int(v),
            Err(_) => tagged(TAG_UINT, &v.to_le_bytes()),
        },
        ScalarValue::Float32(Some(v)) if v.fract() == 0.0 => float(*v as f64)?,
        ScalarValue::Float64(Some(v)) => float(*v)?,
        ScalarValue::Date32(Some(v)) => tagged(TAG_DATE, &(*v as i64).to_le_bytes()),
        ScalarValue::Date64(Some(v)) if v % MILLIS_PER_DAY == 0 => {
            tagged(TAG_DATE, &(v / MILLIS_PER_DAY).to_le_bytes())
        }
        ScalarValue::TimestampSecond(Some(v), _) => timestamp(*v as i128 * 1_000_000_000),
        ScalarValue::TimestampMillisecond(Some(v), _) => timestamp(*v as i128 * 1_000_000),
        ScalarValue::TimestampMicrosecond(Some(v), _) => timestamp(*v as i128 * 1_000),
        ScalarValue::TimestampNanosecond(Some(v), _) => timestamp(*v as i128),
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => tagged(TAG_STR, v.as_bytes()),
        ScalarValue::Binary(Some(v))
        | ScalarValue::LargeBinary(Some(v))
        | ScalarValue::BinaryView(Some(v))
        | ScalarValue::FixedSizeBinary(_, Some(v)) => tagged(TAG_BIN, v),
        _ => return None,
    };
    Some(encoded)
}

pub(crate) fn unsupported_value(kind: IndexKind, value: &ScalarValue) -> IndexError {
    IndexError::UnsupportedValue {
        kind: kind.to_string(),
        value_type: value.data_type().to_string(),
    }
}

fn tagged(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(tag);
    out.extend_from_slice(payload);
    out
}

fn int(v: i64) -> Vec<u8> {
    tagged(TAG_INT, &v.to_le_bytes())
}

fn float(v: f64) -> Option<Vec<u8>> {
    if v.is_nan() {
        return None;
    }
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        return Some(int(v as i64));
    }
    Some(tagged(TAG_FLOAT, &v.to_le_bytes()))
}

fn timestamp(nanos: i128) -> Vec<u8> {
    tagged(TAG_TIMESTAMP, &nanos.to_le_bytes())
}

/// Read exactly `N` bytes, reporting a short read as a malformed index.
pub(crate) fn read_array<const N: usize>(
    input: &mut dyn Read,
    kind: IndexKind,
) -> Result<[u8; N], IndexError> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf).map_err(|e| IndexError::Malformed {
        kind: kind.to_string(),
        reason: format!("truncated header: {e}"),
    })?;
    Ok(buf)
}
