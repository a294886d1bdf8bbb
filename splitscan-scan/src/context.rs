//! Per-range state handed to a scanner.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use splitscan_result::Result;
use splitscan_types::TupleDescriptor;

use crate::partition::PartitionDescriptor;
use crate::scan_range::ScanRange;
use crate::sink::RowBatchSink;
use crate::stream::ScanStream;

/// Default number of rows per emitted batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Binds one scan range to its partition, its open stream and the sink its
/// rows go to. Owned by the worker processing the range.
pub struct ScannerContext {
    partition: Arc<PartitionDescriptor>,
    scan_range: Arc<ScanRange>,
    stream: Box<dyn ScanStream>,
    tuple_desc: Arc<TupleDescriptor>,
    sink: Arc<dyn RowBatchSink>,
    batch_size: usize,
    rows_produced: u64,
}

impl ScannerContext {
    pub fn new(
        partition: Arc<PartitionDescriptor>,
        scan_range: Arc<ScanRange>,
        stream: Box<dyn ScanStream>,
        tuple_desc: Arc<TupleDescriptor>,
        sink: Arc<dyn RowBatchSink>,
    ) -> Self {
        Self {
            partition,
            scan_range,
            stream,
            tuple_desc,
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
            rows_produced: 0,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn partition(&self) -> &PartitionDescriptor {
        &self.partition
    }

    pub fn scan_range(&self) -> &ScanRange {
        &self.scan_range
    }

    pub fn tuple_desc(&self) -> &TupleDescriptor {
        &self.tuple_desc
    }

    pub fn stream(&self) -> &dyn ScanStream {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> &mut dyn ScanStream {
        self.stream.as_mut()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Hand a finished batch to the sink.
    pub fn emit_batch(&mut self, batch: RecordBatch) -> Result<()> {
        let rows = batch.num_rows() as u64;
        self.sink.push(batch)?;
        self.rows_produced += rows;
        Ok(())
    }

    pub fn rows_produced(&self) -> u64 {
        self.rows_produced
    }

    pub fn bytes_read(&self) -> u64 {
        self.stream.bytes_read()
    }
}
