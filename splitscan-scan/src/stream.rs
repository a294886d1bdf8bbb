//! Byte-stream surface the scan path consumes from the I/O layer.

use bytes::Bytes;
use splitscan_result::Result;
use splitscan_types::Compression;

use crate::scan_range::ScanRange;

/// Static facts about the file behind a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_name: String,
    pub file_length: u64,
    pub compression: Compression,
}

/// Readable view of one file, bound to a single scan range.
///
/// Streams are exclusively owned by the worker processing the range.
pub trait ScanStream: Send {
    fn file_desc(&self) -> &FileDescriptor;

    /// Read up to `len` bytes starting at absolute file `offset`. Returns
    /// fewer bytes at end of file and an empty buffer past it.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Bytes>;

    /// Total bytes handed out by `read_at` so far.
    fn bytes_read(&self) -> u64;
}

/// Opens streams for scan ranges.
pub trait ScanStreamProvider: Send + Sync {
    fn open(&self, range: &ScanRange) -> Result<Box<dyn ScanStream>>;
}
