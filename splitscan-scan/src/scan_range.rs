//! Unit of scan work: a contiguous byte region of one file.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use splitscan_types::PartitionId;

/// Terminal status a scan range is cancelled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelStatus {
    /// Benign stop; the range was deliberately skipped.
    Cancelled,
    /// The range failed with this error message.
    Error(String),
}

impl CancelStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, CancelStatus::Error(_))
    }
}

/// A scan range as handed to the scan path by the I/O layer.
///
/// The scan path borrows the range while processing it and cancels it at
/// most once: on failure, or when the partition is pruned. Normal completion
/// is finalized by the I/O layer itself.
pub struct ScanRange {
    file_name: String,
    offset: u64,
    length: u64,
    partition_id: PartitionId,
    cancel_status: OnceLock<CancelStatus>,
    cancel_calls: AtomicUsize,
}

impl ScanRange {
    pub fn new(
        file_name: impl Into<String>,
        offset: u64,
        length: u64,
        partition_id: PartitionId,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            offset,
            length,
            partition_id,
            cancel_status: OnceLock::new(),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    /// Signal the I/O layer that the range's buffers may be released.
    ///
    /// Only the first status is kept.
    pub fn cancel(&self, status: CancelStatus) {
        let calls = self.cancel_calls.fetch_add(1, Ordering::AcqRel) + 1;
        if self.cancel_status.set(status).is_err() {
            tracing::warn!(
                file = %self.file_name,
                offset = self.offset,
                calls,
                "scan range cancelled more than once"
            );
        }
    }

    pub fn cancel_status(&self) -> Option<&CancelStatus> {
        self.cancel_status.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_status.get().is_some()
    }

    /// Number of `cancel` calls observed, duplicates included.
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRange")
            .field("file_name", &self.file_name)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("partition_id", &self.partition_id)
            .field("cancel_status", &self.cancel_status.get())
            .finish()
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.file_name, self.offset, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cancel_status_wins() {
        let range = ScanRange::new("f", 0, 10, 1);
        range.cancel(CancelStatus::Cancelled);
        range.cancel(CancelStatus::Error("late".into()));
        assert_eq!(range.cancel_status(), Some(&CancelStatus::Cancelled));
        assert_eq!(range.cancel_calls(), 2);
    }

    #[test]
    fn display_matches_diagnostic_form() {
        let range = ScanRange::new("hdfs://t/f0", 64, 32, 1);
        assert_eq!(range.to_string(), "hdfs://t/f0(64:32)");
        assert_eq!(range.end(), 96);
        assert!(!range.is_cancelled());
    }
}
