//! End-to-end processing of a single scan range.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use splitscan_result::{Error, Result};
use splitscan_runtime::{
    DiagnosticsSink, FailurePhase, RuntimeFilterRegistry, RuntimeFilterSource, ScanDiagnostic,
};
use splitscan_types::{PartitionId, TupleDescriptor};

use crate::context::{DEFAULT_BATCH_SIZE, ScannerContext};
use crate::partition::PartitionDescriptor;
use crate::partition_filter::PartitionFilterEvaluator;
use crate::scan_range::{CancelStatus, ScanRange};
use crate::scanner::ScannerFactory;
use crate::sink::{NullSink, RowBatchSink};
use crate::stream::ScanStreamProvider;

/// Terminal state of a processed scan range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    Unprocessed,
    ScannerFailed,
    Pruned,
    ScannerFailedDuringProcess,
    Completed,
}

/// What happened to a scan range. A failure here is already reported and
/// the range already cancelled; it is not fatal to the fragment.
#[derive(Debug)]
pub enum SplitOutcome {
    Completed { rows: u64, bytes: u64 },
    Pruned,
    Failed { phase: FailurePhase, error: Error },
}

impl SplitOutcome {
    pub fn state(&self) -> SplitState {
        match self {
            SplitOutcome::Completed { .. } => SplitState::Completed,
            SplitOutcome::Pruned => SplitState::Pruned,
            SplitOutcome::Failed {
                phase: FailurePhase::Prepare,
                ..
            } => SplitState::ScannerFailed,
            SplitOutcome::Failed {
                phase: FailurePhase::Process,
                ..
            } => SplitState::ScannerFailedDuringProcess,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SplitOutcome::Failed { .. })
    }
}

/// Drives one scan range through scanner selection, partition pruning and
/// decoding. Shared by all workers of a fragment; `process` may be called
/// concurrently for distinct ranges.
pub struct SplitProcessor {
    partitions: FxHashMap<PartitionId, Arc<PartitionDescriptor>>,
    tuple_desc: Arc<TupleDescriptor>,
    factory: ScannerFactory,
    evaluator: PartitionFilterEvaluator,
    runtime_filters: Arc<dyn RuntimeFilterSource>,
    streams: Arc<dyn ScanStreamProvider>,
    sink: Arc<dyn RowBatchSink>,
    batch_size: usize,
}

impl SplitProcessor {
    pub fn builder(
        tuple_desc: Arc<TupleDescriptor>,
        streams: Arc<dyn ScanStreamProvider>,
    ) -> SplitProcessorBuilder {
        SplitProcessorBuilder {
            partitions: FxHashMap::default(),
            tuple_desc,
            factory: ScannerFactory::default(),
            runtime_filters: Arc::new(RuntimeFilterRegistry::default()),
            streams,
            sink: Arc::new(NullSink),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn partition(&self, id: PartitionId) -> Option<&Arc<PartitionDescriptor>> {
        self.partitions.get(&id)
    }

    pub fn tuple_desc(&self) -> &TupleDescriptor {
        &self.tuple_desc
    }

    /// Process `range` to completion.
    ///
    /// Every scanner built for the range is closed before this returns. The
    /// range is cancelled at most once: with an error on failure, benignly
    /// when pruned. A range whose partition is unknown is a metadata defect
    /// and surfaces as `Err(MetadataInconsistency)`; the caller cancels it.
    pub fn process(
        &self,
        range: &Arc<ScanRange>,
        diagnostics: &dyn DiagnosticsSink,
    ) -> Result<SplitOutcome> {
        let Some(partition) = self.partitions.get(&range.partition_id()).cloned() else {
            tracing::error!(
                file = range.file_name(),
                partition = range.partition_id(),
                "scan range references an unknown partition"
            );
            return Err(Error::MetadataInconsistency(format!(
                "scan range {range} references unknown partition {}",
                range.partition_id()
            )));
        };

        let stream = match self.streams.open(range) {
            Ok(stream) => stream,
            Err(err) => {
                return self.fail_prepare(range, err.into_prepare_failure(), diagnostics);
            }
        };
        let mut ctx = ScannerContext::new(
            Arc::clone(&partition),
            Arc::clone(range),
            stream,
            Arc::clone(&self.tuple_desc),
            Arc::clone(&self.sink),
        )
        .with_batch_size(self.batch_size);

        let mut scanner = match self.factory.create_and_prepare(&partition, &mut ctx) {
            Ok(scanner) => scanner,
            Err(err) => return self.fail_prepare(range, err, diagnostics),
        };

        let columnar = partition.file_format().is_columnar();
        if columnar {
            match self
                .evaluator
                .should_skip(&partition, self.runtime_filters.as_ref())
            {
                Ok(false) => {}
                Ok(true) => {
                    scanner.close();
                    range.cancel(CancelStatus::Cancelled);
                    tracing::debug!(range = %range, "scan range skipped by partition filter");
                    return Ok(SplitOutcome::Pruned);
                }
                Err(err) => {
                    scanner.close();
                    return self.fail_prepare(range, err.into_prepare_failure(), diagnostics);
                }
            }
        }

        let result = scanner.process(&mut ctx);
        let bytes = ctx.bytes_read();
        match result {
            Ok(()) => {
                scanner.close();
                let rows = ctx.rows_produced();
                tracing::debug!(range = %range, rows, bytes, "scan range completed");
                Ok(SplitOutcome::Completed { rows, bytes })
            }
            Err(err) => {
                let err = err.into_process_failure();
                // Columnar readers do not track a meaningful byte position.
                let bytes_processed = if columnar { 0 } else { bytes };
                scanner.close();
                range.cancel(CancelStatus::Error(err.to_string()));
                diagnostics.report(ScanDiagnostic {
                    file_name: range.file_name().to_string(),
                    offset: range.offset(),
                    length: range.length(),
                    phase: FailurePhase::Process,
                    bytes_processed: Some(bytes_processed),
                    error: err.to_string(),
                })?;
                Ok(SplitOutcome::Failed {
                    phase: FailurePhase::Process,
                    error: err,
                })
            }
        }
    }

    fn fail_prepare(
        &self,
        range: &ScanRange,
        err: Error,
        diagnostics: &dyn DiagnosticsSink,
    ) -> Result<SplitOutcome> {
        range.cancel(CancelStatus::Error(err.to_string()));
        diagnostics.report(ScanDiagnostic {
            file_name: range.file_name().to_string(),
            offset: range.offset(),
            length: range.length(),
            phase: FailurePhase::Prepare,
            bytes_processed: None,
            error: err.to_string(),
        })?;
        Ok(SplitOutcome::Failed {
            phase: FailurePhase::Prepare,
            error: err,
        })
    }
}

impl fmt::Debug for SplitProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitProcessor")
            .field("partitions", &self.partitions.len())
            .field("factory", &self.factory)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

/// Assembles a [`SplitProcessor`].
pub struct SplitProcessorBuilder {
    partitions: FxHashMap<PartitionId, Arc<PartitionDescriptor>>,
    tuple_desc: Arc<TupleDescriptor>,
    factory: ScannerFactory,
    runtime_filters: Arc<dyn RuntimeFilterSource>,
    streams: Arc<dyn ScanStreamProvider>,
    sink: Arc<dyn RowBatchSink>,
    batch_size: usize,
}

impl SplitProcessorBuilder {
    pub fn partition(mut self, partition: PartitionDescriptor) -> Self {
        self.partitions.insert(partition.id(), Arc::new(partition));
        self
    }

    pub fn factory(mut self, factory: ScannerFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn runtime_filters(mut self, filters: Arc<dyn RuntimeFilterSource>) -> Self {
        self.runtime_filters = filters;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn RowBatchSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn build(self) -> SplitProcessor {
        SplitProcessor {
            evaluator: PartitionFilterEvaluator::new(Arc::clone(&self.tuple_desc)),
            partitions: self.partitions,
            tuple_desc: self.tuple_desc,
            factory: self.factory,
            runtime_filters: self.runtime_filters,
            streams: self.streams,
            sink: self.sink,
            batch_size: self.batch_size,
        }
    }
}
