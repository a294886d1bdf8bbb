//! Per-partition template tuple: a row buffer holding the partition's
//! constant key values at their slot offsets.
//!
//! The template is the only shared mutable state on the scan path. Every
//! scan range of a partition may rewrite it, so [`TemplateTupleCell`] keeps it
//! behind a mutex owned by that partition; writers and the filter probe that
//! reads the written values run inside the same critical section.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::datatypes::DataType;
use rustc_hash::FxHashMap;
use splitscan_result::{Error, Result};

use crate::descriptors::{SlotDescriptor, TupleDescriptor, slot_byte_size};
use crate::literal::Literal;
use crate::raw_value::{encode_literal, hash_value_bytes};

/// Fixed-layout row plus out-of-line string payloads keyed by slot offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTuple {
    fixed: Vec<u8>,
    var_len: FxHashMap<usize, Vec<u8>>,
}

impl TemplateTuple {
    /// Allocate a row for `desc` with every slot NULL.
    pub fn new(desc: &TupleDescriptor) -> Self {
        let mut fixed = vec![0u8; desc.byte_size()];
        for slot in desc.slots() {
            let null = slot.null_indicator();
            fixed[null.byte_offset] |= null.bit_mask;
        }
        Self {
            fixed,
            var_len: FxHashMap::default(),
        }
    }

    /// Raw fixed-layout bytes, null indicators included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.fixed
    }

    /// Write `literal` into `slot`. Writing the same literal twice leaves the
    /// tuple byte-for-byte unchanged.
    pub fn write_literal(&mut self, slot: &SlotDescriptor, literal: &Literal) -> Result<()> {
        let range = self.slot_range(slot)?;
        let encoded = encode_literal(literal, slot.data_type())?;
        let null = slot.null_indicator();

        let Some(bytes) = encoded else {
            self.fixed[null.byte_offset] |= null.bit_mask;
            self.fixed[range].fill(0);
            self.var_len.remove(&slot.tuple_offset());
            return Ok(());
        };

        self.fixed[null.byte_offset] &= !null.bit_mask;
        if matches!(slot.data_type(), DataType::Utf8) {
            self.fixed[range].copy_from_slice(&(bytes.len() as u64).to_le_bytes());
            self.var_len.insert(slot.tuple_offset(), bytes);
        } else {
            self.fixed[range].copy_from_slice(&bytes);
        }
        Ok(())
    }

    pub fn is_null(&self, slot: &SlotDescriptor) -> bool {
        let null = slot.null_indicator();
        self.fixed
            .get(null.byte_offset)
            .is_none_or(|byte| byte & null.bit_mask != 0)
    }

    /// Canonical value bytes of `slot`, `None` when NULL.
    pub fn value_bytes(&self, slot: &SlotDescriptor) -> Result<Option<&[u8]>> {
        let range = self.slot_range(slot)?;
        if self.is_null(slot) {
            return Ok(None);
        }
        if matches!(slot.data_type(), DataType::Utf8) {
            let payload = self
                .var_len
                .get(&slot.tuple_offset())
                .map(Vec::as_slice)
                .unwrap_or_default();
            return Ok(Some(payload));
        }
        Ok(Some(&self.fixed[range]))
    }

    /// Hash of the value at `slot` using the fragment seed.
    pub fn hash_slot(&self, slot: &SlotDescriptor, seed: u32) -> Result<u32> {
        Ok(hash_value_bytes(self.value_bytes(slot)?, seed))
    }

    fn slot_range(&self, slot: &SlotDescriptor) -> Result<std::ops::Range<usize>> {
        let start = slot.tuple_offset();
        let end = start + slot_byte_size(slot.data_type())?;
        if end > self.fixed.len() {
            return Err(Error::Internal(format!(
                "slot {} at offset {start} does not fit a {}-byte template tuple",
                slot.id(),
                self.fixed.len()
            )));
        }
        Ok(start..end)
    }
}

/// A partition's template tuple behind its own lock.
///
/// The tuple is allocated lazily on first use, sized for the tuple
/// descriptor the caller passes in.
#[derive(Debug, Default)]
pub struct TemplateTupleCell {
    tuple: Mutex<Option<TemplateTuple>>,
    acquisitions: AtomicU64,
}

impl TemplateTupleCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the template tuple.
    pub fn with_template<R>(
        &self,
        desc: &TupleDescriptor,
        f: impl FnOnce(&mut TemplateTuple) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self
            .tuple
            .lock()
            .map_err(|_| Error::poisoned("partition template tuple"))?;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        let tuple = guard.get_or_insert_with(|| TemplateTuple::new(desc));
        f(tuple)
    }

    /// Copy of the current template tuple, if it has ever been written.
    pub fn snapshot(&self) -> Result<Option<TemplateTuple>> {
        let guard = self
            .tuple
            .lock()
            .map_err(|_| Error::poisoned("partition template tuple"))?;
        Ok(guard.clone())
    }

    /// Number of times the write path has taken the lock.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> TupleDescriptor {
        TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Int32)
            .slot(2, 1, DataType::Utf8)
            .build()
            .unwrap()
    }

    #[test]
    fn new_template_is_all_null() {
        let desc = descriptor();
        let tuple = TemplateTuple::new(&desc);
        for slot in desc.slots() {
            assert!(tuple.is_null(slot));
            assert_eq!(tuple.value_bytes(slot).unwrap(), None);
        }
    }

    #[test]
    fn writes_are_idempotent() {
        let desc = descriptor();
        let mut tuple = TemplateTuple::new(&desc);
        let year = &desc.slots()[0];
        let region = &desc.slots()[1];

        tuple.write_literal(year, &Literal::Int128(2024)).unwrap();
        tuple.write_literal(region, &Literal::from("emea")).unwrap();
        let first = tuple.clone();

        tuple.write_literal(year, &Literal::Int128(2024)).unwrap();
        tuple.write_literal(region, &Literal::from("emea")).unwrap();
        assert_eq!(tuple, first);
        assert_eq!(tuple.as_bytes(), first.as_bytes());
        assert_eq!(tuple.value_bytes(region).unwrap(), Some(&b"emea"[..]));
    }

    #[test]
    fn null_write_clears_previous_value() {
        let desc = descriptor();
        let mut tuple = TemplateTuple::new(&desc);
        let region = &desc.slots()[1];
        tuple.write_literal(region, &Literal::from("apac")).unwrap();
        tuple.write_literal(region, &Literal::Null).unwrap();
        assert!(tuple.is_null(region));
        assert_eq!(tuple, TemplateTuple::new(&desc));
    }

    #[test]
    fn cell_allocates_lazily_and_counts_acquisitions() {
        let desc = descriptor();
        let cell = TemplateTupleCell::new();
        assert_eq!(cell.snapshot().unwrap(), None);
        assert_eq!(cell.acquisitions(), 0);

        cell.with_template(&desc, |tuple| {
            tuple.write_literal(&desc.slots()[0], &Literal::Int128(1))
        })
        .unwrap();
        assert_eq!(cell.acquisitions(), 1);
        assert!(cell.snapshot().unwrap().is_some());
    }
}
