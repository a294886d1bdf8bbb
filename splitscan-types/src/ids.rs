//! Identifiers shared across the split-scan crates.
//!
//! These live in `splitscan-types` so descriptors, runtime filters and the
//! scan path can agree on them without depending on each other.

/// Identifier of a slot (one column position inside a tuple layout).
///
/// Runtime bitmap filters are registered per slot id.
pub type SlotId = u32;

/// Identifier of a tuple descriptor.
pub type TupleId = u32;

/// Identifier of a table partition within a query fragment.
pub type PartitionId = i64;

/// Identifier of the scan node owning a set of scan ranges.
pub type PlanNodeId = u32;
