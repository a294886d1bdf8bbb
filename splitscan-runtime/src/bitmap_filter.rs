//! Hash bitmap used as a runtime membership filter.
//!
//! The build side of a join sets bit `h mod num_bits` for every value hash
//! `h`. A probe whose bit is clear proves the value never occurred on the
//! build side; a set bit is only "maybe".

use croaring::Bitmap;
use splitscan_result::{Error, Result};
use splitscan_types::{Literal, hash_literal};

use arrow::datatypes::DataType;

#[derive(Debug, Clone)]
pub struct BitmapFilter {
    bits: Bitmap,
    num_bits: u32,
}

impl BitmapFilter {
    pub fn new(num_bits: u32) -> Result<Self> {
        if num_bits == 0 {
            return Err(Error::InvalidArgumentError(
                "bitmap filter needs at least one bit".into(),
            ));
        }
        Ok(Self {
            bits: Bitmap::new(),
            num_bits,
        })
    }

    /// Build a filter from precomputed value hashes.
    pub fn from_hashes(num_bits: u32, hashes: impl IntoIterator<Item = u32>) -> Result<Self> {
        let mut filter = Self::new(num_bits)?;
        for hash in hashes {
            filter.insert_hash(hash);
        }
        Ok(filter)
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> u64 {
        self.bits.cardinality()
    }

    #[inline]
    pub fn insert_hash(&mut self, hash: u32) {
        self.bits.add(hash % self.num_bits);
    }

    /// Hash `literal` as a slot of `data_type` with `seed` and insert it.
    pub fn insert_literal(&mut self, literal: &Literal, data_type: &DataType, seed: u32) -> Result<()> {
        self.insert_hash(hash_literal(literal, data_type, seed)?);
        Ok(())
    }

    /// `false` means the value is definitely absent.
    #[inline]
    pub fn might_contain(&self, hash: u32) -> bool {
        self.bits.contains(hash % self.num_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_rejects_everything() {
        let filter = BitmapFilter::new(64).unwrap();
        assert!(!filter.might_contain(0));
        assert!(!filter.might_contain(12345));
        assert_eq!(filter.cardinality(), 0);
    }

    #[test]
    fn hashes_wrap_modulo_bit_count() {
        let filter = BitmapFilter::from_hashes(16, [3]).unwrap();
        assert!(filter.might_contain(3));
        assert!(filter.might_contain(19));
        assert!(!filter.might_contain(4));
    }

    #[test]
    fn inserted_literals_are_found_with_same_seed() {
        let mut filter = BitmapFilter::new(1 << 20).unwrap();
        filter
            .insert_literal(&Literal::Int128(2021), &DataType::Int32, 9)
            .unwrap();
        let probe = hash_literal(&Literal::Int128(2021), &DataType::Int32, 9).unwrap();
        assert!(filter.might_contain(probe));
    }

    #[test]
    fn zero_bits_is_invalid() {
        assert!(matches!(
            BitmapFilter::new(0),
            Err(Error::InvalidArgumentError(_))
        ));
    }
}
