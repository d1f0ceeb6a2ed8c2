use std::{
    f64::consts::LN_2,
    io::{Read, Write},
};

use datafusion_common::ScalarValue;
use roaring::RoaringBitmap;
use xxhash_rust::xxh3::xxh3_128;

use super::{Index, IndexKind, canonical_bytes, read_array, unsupported_value};
use crate::{error::IndexError, expr::CmpOp};

const MAGIC: &[u8; 4] = b"BLOM";

const DEFAULT_EXPECTED_ENTRIES: usize = 200_000;
const DEFAULT_FPP: f64 = 0.05;
const MIN_BITS: u32 = 64;
const MAX_HASHES: u32 = 16;

/// Bloom filter over the values of a stripe.
///
/// The bit array lives in a roaring bitmap, so sparse filters stay small on
/// disk. Sizing follows `expected_entries` and the false-positive rate; it is
/// fixed once the first value has been added.
#[derive(Clone, Debug)]
pub struct BloomIndex {
    bits: RoaringBitmap,
    num_bits: u32,
    num_hashes: u32,
    expected_entries: usize,
    fpp: f64,
}

impl Default for BloomIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl BloomIndex {
    pub fn new() -> Self {
        Self::with_fpp(DEFAULT_EXPECTED_ENTRIES, DEFAULT_FPP)
    }

    /// Create a filter sized for `expected_entries` at false-positive rate `fpp`.
    pub fn with_fpp(expected_entries: usize, fpp: f64) -> Self {
        let fpp = if fpp > 0.0 && fpp < 1.0 { fpp } else { DEFAULT_FPP };
        let (num_bits, num_hashes) = optimal_shape(expected_entries, fpp);
        Self {
            bits: RoaringBitmap::new(),
            num_bits,
            num_hashes,
            expected_entries,
            fpp,
        }
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    fn positions(&self, bytes: &[u8]) -> impl Iterator<Item = u32> + use<> {
        let hash = xxh3_128(bytes);
        let h1 = hash as u64;
        let h2 = (hash >> 64) as u64;
        let num_bits = self.num_bits as u64;
        (0..self.num_hashes as u64)
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % num_bits) as u32)
    }
}

fn optimal_shape(expected_entries: usize, fpp: f64) -> (u32, u32) {
    let n = expected_entries.max(1) as f64;
    let bits = (-n * fpp.ln() / (LN_2 * LN_2)).ceil();
    let num_bits = bits.clamp(MIN_BITS as f64, u32::MAX as f64) as u32;
    let hashes = (num_bits as f64 / n * LN_2).round();
    let num_hashes = hashes.clamp(1.0, MAX_HASHES as f64) as u32;
    (num_bits, num_hashes)
}

impl Index for BloomIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Bloom
    }

    fn add_values(&mut self, values: &[ScalarValue]) -> Result<(), IndexError> {
        for value in values.iter().filter(|v| !v.is_null()) {
            let bytes = canonical_bytes(value).ok_or_else(|| unsupported_value(self.kind(), value))?;
            for position in self.positions(&bytes) {
                self.bits.insert(position);
            }
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
        Ok(self.positions(&bytes).all(|position| self.bits.contains(position)))
    }

    fn supports(&self, op: CmpOp) -> bool {
        op == CmpOp::Eq
    }

    fn persist(&self, out: &mut dyn Write) -> Result<(), IndexError> {
        out.write_all(MAGIC)?;
        out.write_all(&self.num_bits.to_le_bytes())?;
        out.write_all(&self.num_hashes.to_le_bytes())?;
        out.write_all(&(self.expected_entries as u64).to_le_bytes())?;
        out.write_all(&self.fpp.to_le_bytes())?;
        self.bits.serialize_into(&mut *out)?;
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<(), IndexError> {
        let kind = self.kind();
        let malformed = |reason: String| IndexError::Malformed {
            kind: kind.to_string(),
            reason,
        };

        let magic: [u8; 4] = read_array(input, kind)?;
        if &magic != MAGIC {
            return Err(malformed(format!("bad magic {magic:?}")));
        }
        let num_bits = u32::from_le_bytes(read_array(input, kind)?);
        let num_hashes = u32::from_le_bytes(read_array(input, kind)?);
        let expected = u64::from_le_bytes(read_array(input, kind)?);
        let fpp = f64::from_le_bytes(read_array(input, kind)?);
        if num_bits < MIN_BITS || !(1..=MAX_HASHES).contains(&num_hashes) {
            return Err(malformed(format!(
                "invalid shape: {num_bits} bits, {num_hashes} hashes"
            )));
        }
        let bits = RoaringBitmap::deserialize_from(&mut *input).map_err(|e| malformed(e.to_string()))?;
        if bits.max().is_some_and(|max| max >= num_bits) {
            return Err(malformed("bit set outside of filter".to_string()));
        }

        self.bits = bits;
        self.num_bits = num_bits;
        self.num_hashes = num_hashes;
        self.expected_entries = expected as usize;
        self.fpp = fpp;
        Ok(())
    }

    fn expected_entries(&self) -> usize {
        self.expected_entries
    }

    fn set_expected_entries(&mut self, expected_entries: usize) {
        self.expected_entries = expected_entries;
        if self.bits.is_empty() {
            let (num_bits, num_hashes) = optimal_shape(expected_entries, self.fpp);
            self.num_bits = num_bits;
            self.num_hashes = num_hashes;
        }
    }
}
