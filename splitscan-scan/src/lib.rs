//! File-split scan path of a table scan.
//!
//! For every scan range the [`SplitProcessor`] resolves the range's
//! partition, has the [`ScannerFactory`] build and prepare the reader for the
//! partition's file format, asks the [`PartitionFilterEvaluator`] whether a
//! runtime bitmap filter rules the whole partition out, and otherwise drives
//! the reader to completion. Scanners are always closed and ranges cancelled
//! at most once, on every path.
//!
//! [`ScanNode`] runs the processor over many ranges on a Rayon pool.

#![forbid(unsafe_code)]

pub mod context;
pub mod mem;
pub mod partition;
pub mod partition_filter;
pub mod processor;
pub mod scan_node;
pub mod scan_range;
pub mod scanner;
pub mod sink;
pub mod stream;

pub use context::{DEFAULT_BATCH_SIZE, ScannerContext};
pub use mem::{MemFileSystem, MemStream};
pub use partition::{PartitionDescriptor, PartitionKeyExpr, TextFormat};
pub use partition_filter::PartitionFilterEvaluator;
pub use processor::{SplitOutcome, SplitProcessor, SplitProcessorBuilder, SplitState};
pub use scan_node::{ScanNode, ScanNodeConfig, ScanSummary};
pub use scan_range::{CancelStatus, ScanRange};
pub use scanner::{
    Scanner, ScannerConstructor, ScannerFactory, ScannerHandle, ScannerKind, ScannerRegistry,
    ScannerState, TextScanner, scanner_kind_for,
};
pub use sink::{CollectingSink, NullSink, RowBatchSink};
pub use stream::{FileDescriptor, ScanStream, ScanStreamProvider};
