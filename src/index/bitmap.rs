use std::io::{Read, Write};

use datafusion_common::ScalarValue;
use roaring::RoaringBitmap;
use xxhash_rust::xxh3::xxh3_64;

use super::{Index, IndexKind, canonical_bytes, read_array, unsupported_value};
use crate::{error::IndexError, expr::CmpOp};

const MAGIC: &[u8; 4] = b"BMAP";

/// Equality index over the distinct values of a stripe.
///
/// Each value is reduced to a 32-bit fingerprint kept in a roaring bitmap.
/// Fingerprint collisions can only make `matches` answer `true` spuriously.
#[derive(Clone, Debug, Default)]
pub struct BitmapIndex {
    fingerprints: RoaringBitmap,
    expected_entries: usize,
}

impl BitmapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct fingerprints recorded.
    pub fn len(&self) -> u64 {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

fn fingerprint(bytes: &[u8]) -> u32 {
    let hash = xxh3_64(bytes);
    (hash ^ (hash >> 32)) as u32
}

impl Index for BitmapIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Bitmap
    }

    fn add_values(&mut self, values: &[ScalarValue]) -> Result<(), IndexError> {
        for value in values.iter().filter(|v| !v.is_null()) {
            let bytes = canonical_bytes(value).ok_or_else(|| unsupported_value(self.kind(), value))?;
            self.fingerprints.insert(fingerprint(&bytes));
        }
        Ok(())
    }

    fn matches(&self, value: &ScalarValue, op: CmpOp) -> Result<bool, IndexError> {
        if !self.supports(op) {
            return Err(IndexError::UnsupportedOperator {
                kind: self.kind().to_string(),
                operator: op.symbol().to_string(),
            });
        }
        let bytes = canonical_bytes(value).ok_or_else(|| unsupported_value(self.kind(), value))?;
        Ok(self.fingerprints.contains(fingerprint(&bytes)))
    }

    fn supports(&self, op: CmpOp) -> bool {
        op == CmpOp::Eq
    }

    fn persist(&self, out: &mut dyn Write) -> Result<(), IndexError> {
        out.write_all(MAGIC)?;
        out.write_all(&(self.expected_entries as u64).to_le_bytes())?;
        self.fingerprints.serialize_into(&mut *out)?;
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<(), IndexError> {
        let magic: [u8; 4] = read_array(input, self.kind())?;
        if &magic != MAGIC {
            return Err(IndexError::Malformed {
                kind: self.kind().to_string(),
                reason: format!("bad magic {magic:?}"),
            });
        }
        let expected = u64::from_le_bytes(read_array(input, self.kind())?);
        let fingerprints =
            RoaringBitmap::deserialize_from(&mut *input).map_err(|e| IndexError::Malformed {
                kind: self.kind().to_string(),
                reason: e.to_string(),
            })?;
        self.expected_entries = expected as usize;
        self.fingerprints = fingerprints;
        Ok(())
    }

    fn expected_entries(&self) -> usize {
        self.expected_entries
    }

    fn set_expected_entries(&mut self, expected_entries: usize) {
        self.expected_entries = expected_entries;
    }
}
