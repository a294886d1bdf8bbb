//! Downstream consumer of decoded row batches.

use std::sync::Mutex;

use arrow::record_batch::RecordBatch;
use splitscan_result::{Error, Result};

/// Receives the row batches scanners produce. Shared by every worker of a
/// fragment, so implementations synchronize internally.
pub trait RowBatchSink: Send + Sync {
    fn push(&self, batch: RecordBatch) -> Result<()>;
}

/// Sink that keeps every batch in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    batches: Mutex<Vec<RecordBatch>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Result<Vec<RecordBatch>> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| Error::poisoned("CollectingSink batches"))?;
        Ok(batches.clone())
    }

    pub fn num_rows(&self) -> Result<usize> {
        Ok(self.batches()?.iter().map(RecordBatch::num_rows).sum())
    }
}

impl RowBatchSink for CollectingSink {
    fn push(&self, batch: RecordBatch) -> Result<()> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| Error::poisoned("CollectingSink batches"))?;
        batches.push(batch);
        Ok(())
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RowBatchSink for NullSink {
    fn push(&self, _batch: RecordBatch) -> Result<()> {
        Ok(())
    }
}
