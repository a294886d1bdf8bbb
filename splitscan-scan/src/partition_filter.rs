//! Partition pruning with runtime bitmap filters.

use std::sync::Arc;

use splitscan_result::Result;
use splitscan_runtime::RuntimeFilterSource;
use splitscan_types::TupleDescriptor;

use crate::partition::PartitionDescriptor;

/// Decides whether a whole partition can be skipped because a runtime bitmap
/// filter rules out one of its key values.
#[derive(Debug, Clone)]
pub struct PartitionFilterEvaluator {
    tuple_desc: Arc<TupleDescriptor>,
}

impl PartitionFilterEvaluator {
    pub fn new(tuple_desc: Arc<TupleDescriptor>) -> Self {
        Self { tuple_desc }
    }

    /// Pruning is only attempted when every materialized slot is a partition
    /// key. A materialized non-key column means rows still have to be read.
    pub fn gate_passes(&self, num_partition_keys: usize) -> bool {
        let materialized = self.tuple_desc.materialized_slots().count();
        let keys = self
            .tuple_desc
            .materialized_slots()
            .filter(|slot| slot.is_partition_key(num_partition_keys))
            .count();
        materialized <= keys
    }

    /// `true` when the partition is definitely filtered out.
    ///
    /// The key values are written into the partition's template tuple and
    /// probed under the template lock, so concurrent scan ranges of the same
    /// partition never observe a half-written template. With no registered
    /// filters the template is left untouched.
    pub fn should_skip(
        &self,
        partition: &PartitionDescriptor,
        filters: &dyn RuntimeFilterSource,
    ) -> Result<bool> {
        let num_keys = partition.num_partition_keys();
        if !self.gate_passes(num_keys) || filters.bitmap_filter_count() == 0 {
            return Ok(false);
        }

        let key_slots = self.tuple_desc.partition_key_slots(num_keys);
        let exprs = partition.partition_key_exprs();
        let seed = filters.fragment_hash_seed();

        partition.template().with_template(&self.tuple_desc, |template| {
            for slot in &key_slots {
                let literal = exprs[slot.col_pos()].evaluate_literal()?;
                template.write_literal(slot, &literal)?;
            }

            for slot in self.tuple_desc.materialized_slots() {
                let Some(filter) = filters.bitmap_filter(slot.id()) else {
                    continue;
                };
                let hash = template.hash_slot(slot, seed)?;
                if !filter.might_contain(hash) {
                    tracing::debug!(
                        partition = partition.id(),
                        slot = slot.id(),
                        "partition pruned by bitmap filter"
                    );
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }
}
