//! Canonical byte form of slot values and the seeded hash runtime filters
//! are keyed by.
//!
//! Fixed-width values are stored little-endian at their slot offset; strings
//! hash their raw UTF-8 bytes. Filter builders hash build-side values with
//! [`hash_literal`] so probes against template tuples agree bit for bit.

use arrow::datatypes::DataType;
use splitscan_result::{Error, Result};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::literal::{Literal, LiteralCastError, LiteralExt};

/// Bytes hashed in place of a NULL value.
const NULL_HASH_SENTINEL: [u8; 4] = 0x58081667u32.to_le_bytes();

/// Encode a literal into the canonical bytes for a slot of `data_type`.
///
/// Returns `None` for NULL.
pub fn encode_literal(literal: &Literal, data_type: &DataType) -> Result<Option<Vec<u8>>> {
    if literal.is_null() {
        return Ok(None);
    }
    let cast_err = |err: LiteralCastError| {
        Error::InvalidArgumentError(format!(
            "partition key {} does not fit {data_type:?}: {err}",
            literal.format_display()
        ))
    };
    let bytes = match data_type {
        DataType::Boolean => vec![u8::from(literal.to_native::<bool>().map_err(cast_err)?)],
        DataType::Int8 => literal.to_native::<i8>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Int16 => literal.to_native::<i16>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Int32 => literal.to_native::<i32>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Int64 => literal.to_native::<i64>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Float32 => literal.to_native::<f32>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Float64 => literal.to_native::<f64>().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Date32 => literal.to_date32().map_err(cast_err)?.to_le_bytes().to_vec(),
        DataType::Utf8 => literal.to_string_owned().map_err(cast_err)?.into_bytes(),
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "unsupported slot type: {other:?}"
            )));
        }
    };
    Ok(Some(bytes))
}

/// Hash a slot value (canonical bytes, or `None` for NULL) with the
/// fragment's seed.
#[inline]
pub fn hash_value_bytes(value: Option<&[u8]>, seed: u32) -> u32 {
    let bytes = value.unwrap_or(&NULL_HASH_SENTINEL);
    xxh3_64_with_seed(bytes, u64::from(seed)) as u32
}

/// Hash a literal as if it had been written into a slot of `data_type`.
pub fn hash_literal(literal: &Literal, data_type: &DataType, seed: u32) -> Result<u32> {
    let encoded = encode_literal(literal, data_type)?;
    Ok(hash_value_bytes(encoded.as_deref(), seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_change_the_hash() {
        let lit = Literal::Int128(7);
        let narrow = hash_literal(&lit, &DataType::Int32, 11).unwrap();
        let wide = hash_literal(&lit, &DataType::Int64, 11).unwrap();
        assert_ne!(narrow, wide);
    }

    #[test]
    fn seed_changes_the_hash() {
        let lit = Literal::from("2024-01-01");
        let a = hash_literal(&lit, &DataType::Utf8, 1).unwrap();
        let b = hash_literal(&lit, &DataType::Utf8, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn null_hashes_the_sentinel() {
        let null = hash_literal(&Literal::Null, &DataType::Int32, 3).unwrap();
        assert_eq!(null, hash_value_bytes(None, 3));
    }

    #[test]
    fn out_of_range_literal_is_rejected() {
        let err = encode_literal(&Literal::Int128(1 << 40), &DataType::Int32).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(msg) if msg.contains("does not fit")));
    }
}
