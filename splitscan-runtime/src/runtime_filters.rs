//! Query-wide runtime filters as seen by one fragment.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use splitscan_types::SlotId;

use crate::bitmap_filter::BitmapFilter;

/// Where the scan path fetches runtime bitmap filters from.
///
/// Filters are read-only once published; implementations hand out borrows.
pub trait RuntimeFilterSource: Send + Sync {
    /// Number of bitmap filters registered for the fragment.
    fn bitmap_filter_count(&self) -> usize;

    /// Filter registered for `slot`, if any.
    fn bitmap_filter(&self, slot: SlotId) -> Option<&BitmapFilter>;

    /// Seed every value hash probed against the filters must use.
    fn fragment_hash_seed(&self) -> u32;
}

/// Immutable set of bitmap filters keyed by slot id.
#[derive(Debug, Clone, Default)]
pub struct RuntimeFilterRegistry {
    filters: FxHashMap<SlotId, Arc<BitmapFilter>>,
    fragment_hash_seed: u32,
}

impl RuntimeFilterRegistry {
    pub fn new(fragment_hash_seed: u32) -> Self {
        Self {
            filters: FxHashMap::default(),
            fragment_hash_seed,
        }
    }

    /// Register `filter` for `slot`, replacing any previous one.
    pub fn with_filter(mut self, slot: SlotId, filter: BitmapFilter) -> Self {
        self.insert(slot, Arc::new(filter));
        self
    }

    pub fn insert(&mut self, slot: SlotId, filter: Arc<BitmapFilter>) -> Option<Arc<BitmapFilter>> {
        self.filters.insert(slot, filter)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl RuntimeFilterSource for RuntimeFilterRegistry {
    fn bitmap_filter_count(&self) -> usize {
        self.filters.len()
    }

    fn bitmap_filter(&self, slot: SlotId) -> Option<&BitmapFilter> {
        self.filters.get(&slot).map(Arc::as_ref)
    }

    fn fragment_hash_seed(&self) -> u32 {
        self.fragment_hash_seed
    }
}

impl<T: RuntimeFilterSource + ?Sized> RuntimeFilterSource for Arc<T> {
    fn bitmap_filter_count(&self) -> usize {
        (**self).bitmap_filter_count()
    }

    fn bitmap_filter(&self, slot: SlotId) -> Option<&BitmapFilter> {
        (**self).bitmap_filter(slot)
    }

    fn fragment_hash_seed(&self) -> u32 {
        (**self).fragment_hash_seed()
    }
}
