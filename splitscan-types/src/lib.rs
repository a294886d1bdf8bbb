//! Shared vocabulary of the split-scan crates: identifiers, literals, file
//! formats, row layout and the partition template tuple.

pub mod descriptors;
pub mod format;
pub mod ids;
pub mod literal;
pub mod raw_value;
pub mod template;

pub use descriptors::{
    NullIndicatorOffset, SlotDescriptor, TupleDescriptor, TupleDescriptorBuilder, slot_byte_size,
};
pub use format::{Compression, FileFormat};
pub use ids::{PartitionId, PlanNodeId, SlotId, TupleId};
pub use literal::{FromLiteral, Literal, LiteralCastError, LiteralExt};
pub use raw_value::{encode_literal, hash_literal, hash_value_bytes};
pub use template::{TemplateTuple, TemplateTupleCell};
