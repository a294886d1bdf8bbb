//! Static row layout: which columns a scan materializes and where each one
//! lives inside a fixed-layout row buffer.
//!
//! A row starts with its null-indicator bytes (one bit per slot), followed by
//! the slots in declaration order, each aligned to its own width. Utf8 slots
//! hold the payload length inline; the payload itself lives beside the row
//! (see [`crate::TemplateTuple`]).

use arrow::datatypes::DataType;
use splitscan_result::{Error, Result};

use crate::ids::{SlotId, TupleId};

/// Location of a slot's null bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullIndicatorOffset {
    pub byte_offset: usize,
    pub bit_mask: u8,
}

/// One column position of a tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    id: SlotId,
    parent: TupleId,
    col_pos: usize,
    data_type: DataType,
    materialized: bool,
    tuple_offset: usize,
    null_indicator: NullIndicatorOffset,
}

impl SlotDescriptor {
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Tuple descriptor this slot belongs to.
    pub fn parent(&self) -> TupleId {
        self.parent
    }

    /// Column position in the table; partition-key columns come first.
    pub fn col_pos(&self) -> usize {
        self.col_pos
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Byte offset of the slot inside the row buffer.
    pub fn tuple_offset(&self) -> usize {
        self.tuple_offset
    }

    pub fn null_indicator(&self) -> NullIndicatorOffset {
        self.null_indicator
    }

    /// Whether this slot holds a partition-key ("clustering") column.
    pub fn is_partition_key(&self, num_partition_keys: usize) -> bool {
        self.col_pos < num_partition_keys
    }
}

/// Schema of the rows a scan produces.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDescriptor {
    id: TupleId,
    slots: Vec<SlotDescriptor>,
    byte_size: usize,
    num_null_bytes: usize,
}

impl TupleDescriptor {
    pub fn builder(id: TupleId) -> TupleDescriptorBuilder {
        TupleDescriptorBuilder {
            id,
            specs: Vec::new(),
        }
    }

    pub fn id(&self) -> TupleId {
        self.id
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&SlotDescriptor> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    /// Total size of a row buffer, including null-indicator bytes.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn num_null_bytes(&self) -> usize {
        self.num_null_bytes
    }

    /// Materialized slots that belong to this tuple, in declaration order.
    pub fn materialized_slots(&self) -> impl Iterator<Item = &SlotDescriptor> {
        self.slots
            .iter()
            .filter(move |slot| slot.materialized && slot.parent == self.id)
    }

    /// Materialized slots holding partition-key columns.
    pub fn partition_key_slots(&self, num_partition_keys: usize) -> Vec<SlotDescriptor> {
        self.materialized_slots()
            .filter(|slot| slot.is_partition_key(num_partition_keys))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
struct SlotSpec {
    id: SlotId,
    col_pos: usize,
    data_type: DataType,
    materialized: bool,
}

/// Lays out a [`TupleDescriptor`].
#[derive(Debug, Clone)]
pub struct TupleDescriptorBuilder {
    id: TupleId,
    specs: Vec<SlotSpec>,
}

impl TupleDescriptorBuilder {
    /// Add a materialized slot.
    pub fn slot(self, id: SlotId, col_pos: usize, data_type: DataType) -> Self {
        self.push(id, col_pos, data_type, true)
    }

    /// Add a slot that is part of the layout but not materialized by the scan.
    pub fn unmaterialized_slot(self, id: SlotId, col_pos: usize, data_type: DataType) -> Self {
        self.push(id, col_pos, data_type, false)
    }

    fn push(mut self, id: SlotId, col_pos: usize, data_type: DataType, materialized: bool) -> Self {
        self.specs.push(SlotSpec {
            id,
            col_pos,
            data_type,
            materialized,
        });
        self
    }

    pub fn build(self) -> Result<TupleDescriptor> {
        let num_null_bytes = self.specs.len().div_ceil(8);
        let mut offset = num_null_bytes;
        let mut slots = Vec::with_capacity(self.specs.len());

        for (idx, spec) in self.specs.into_iter().enumerate() {
            if slots.iter().any(|slot: &SlotDescriptor| slot.id == spec.id) {
                return Err(Error::InvalidArgumentError(format!(
                    "duplicate slot id {} in tuple {}",
                    spec.id, self.id
                )));
            }
            let width = slot_byte_size(&spec.data_type)?;
            offset = offset.next_multiple_of(width);
            slots.push(SlotDescriptor {
                id: spec.id,
                parent: self.id,
                col_pos: spec.col_pos,
                data_type: spec.data_type,
                materialized: spec.materialized,
                tuple_offset: offset,
                null_indicator: NullIndicatorOffset {
                    byte_offset: idx / 8,
                    bit_mask: 1 << (idx % 8),
                },
            });
            offset += width;
        }

        Ok(TupleDescriptor {
            id: self.id,
            slots,
            byte_size: offset,
            num_null_bytes,
        })
    }
}

/// Width of a slot's inline representation.
pub fn slot_byte_size(data_type: &DataType) -> Result<usize> {
    match data_type {
        DataType::Boolean | DataType::Int8 => Ok(1),
        DataType::Int16 => Ok(2),
        DataType::Int32 | DataType::Float32 | DataType::Date32 => Ok(4),
        DataType::Int64 | DataType::Float64 => Ok(8),
        // Payload length; bytes are stored out of line.
        DataType::Utf8 => Ok(8),
        other => Err(Error::InvalidArgumentError(format!(
            "unsupported slot type: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_aligned_after_null_bytes() {
        let desc = TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Boolean)
            .slot(2, 1, DataType::Int64)
            .slot(3, 2, DataType::Int16)
            .slot(4, 3, DataType::Utf8)
            .build()
            .unwrap();

        let offsets: Vec<_> = desc.slots().iter().map(|s| s.tuple_offset()).collect();
        // 1 null byte, bool at 1, i64 aligned to 8, i16 at 16, utf8 len at 24.
        assert_eq!(offsets, vec![1, 8, 16, 24]);
        assert_eq!(desc.byte_size(), 32);
        assert_eq!(desc.num_null_bytes(), 1);
    }

    #[test]
    fn null_bits_spill_into_second_byte() {
        let mut builder = TupleDescriptor::builder(7);
        for id in 0..9 {
            builder = builder.slot(id, id as usize, DataType::Int8);
        }
        let desc = builder.build().unwrap();
        let ninth = desc.slot(8).unwrap().null_indicator();
        assert_eq!(ninth, NullIndicatorOffset { byte_offset: 1, bit_mask: 1 });
        assert_eq!(desc.num_null_bytes(), 2);
    }

    #[test]
    fn partition_key_slots_skip_unmaterialized_and_file_columns() {
        let desc = TupleDescriptor::builder(0)
            .slot(10, 0, DataType::Int32)
            .unmaterialized_slot(11, 1, DataType::Utf8)
            .slot(12, 2, DataType::Utf8)
            .build()
            .unwrap();
        let keys: Vec<_> = desc.partition_key_slots(2).iter().map(|s| s.id()).collect();
        assert_eq!(keys, vec![10]);
        assert_eq!(desc.materialized_slots().count(), 2);
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let err = TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Binary)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
    }
}
