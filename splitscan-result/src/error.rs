use std::{fmt, io};
use thiserror::Error;

/// Unified error type for the split-scan crates.
///
/// Scan-range level failures (`UnsupportedFormat`, `ScannerPrepareFailure`,
/// `ScannerProcessFailure`) are recovered at the split processor boundary and
/// reported as a failed range. `MetadataInconsistency` is fragment-fatal and
/// always propagates to the caller of the dispatch loop.
///
/// A pruned scan range is not an error and never appears here.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a scan range.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while assembling row batches.
    ///
    /// Raised by the scanners when a decoded column cannot be cast to its slot
    /// type or when a `RecordBatch` does not match its schema.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid caller input: bad descriptor layout, literal that does not fit
    /// its slot, malformed debug action string.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// A file or entry was not found by the I/O layer.
    #[error("Storage key not found")]
    NotFound,

    /// The partition's (file format, compression) pair has no scanner.
    ///
    /// Fatal to the scan range only. Surfaced before any scanner is built.
    #[error("Unknown Hdfs file format type: {0}")]
    UnsupportedFormat(String),

    /// Scanner construction or prepare-phase failure.
    ///
    /// Includes failures injected by the prepare-scanner debug action and
    /// plugin scanners that were never registered. The scan range is cancelled
    /// and no data is read.
    #[error("failed to prepare scanner: {0}")]
    ScannerPrepareFailure(String),

    /// Failure while a scanner was decoding its scan range.
    ///
    /// The scanner is still closed and the range cancelled; diagnostics carry
    /// the number of bytes processed before the failure.
    #[error("scanner failed while processing: {0}")]
    ScannerProcessFailure(String),

    /// A scan range references a partition the fragment does not know about.
    ///
    /// This is a metadata-consistency defect, not a recoverable per-range
    /// error. The fragment must abort.
    #[error("metadata inconsistency: {0}")]
    MetadataInconsistency(String),

    /// The dispatch loop gave up on the fragment (error threshold reached).
    #[error("scan aborted: {0}")]
    ScanAborted(String),

    /// Internal error indicating a bug or unexpected state, including
    /// poisoned locks.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap any displayable error as a prepare-phase failure.
    ///
    /// Errors that already are prepare failures pass through unchanged so
    /// the message is not prefixed twice.
    ///
    /// # Examples
    ///
    /// ```
    /// use splitscan_result::Error;
    ///
    /// let err = Error::scanner_prepare("Debug Action: FAIL");
    /// assert!(matches!(err, Error::ScannerPrepareFailure(msg) if msg == "Debug Action: FAIL"));
    /// ```
    #[inline]
    pub fn scanner_prepare<E: fmt::Display>(err: E) -> Self {
        Error::ScannerPrepareFailure(err.to_string())
    }

    /// Wrap any displayable error as a process-phase failure.
    #[inline]
    pub fn scanner_process<E: fmt::Display>(err: E) -> Self {
        Error::ScannerProcessFailure(err.to_string())
    }

    /// Convert an error raised while building or preparing a scanner.
    pub fn into_prepare_failure(self) -> Self {
        match self {
            err @ (Error::ScannerPrepareFailure(_) | Error::UnsupportedFormat(_)) => err,
            other => Error::scanner_prepare(other),
        }
    }

    /// Convert an error raised by `Scanner::process`.
    pub fn into_process_failure(self) -> Self {
        match self {
            err @ Error::ScannerProcessFailure(_) => err,
            other => Error::scanner_process(other),
        }
    }

    /// Build the error used for a poisoned lock.
    #[inline]
    pub fn poisoned(what: &str) -> Self {
        Error::Internal(format!("{what} lock poisoned"))
    }

    /// Whether the error must abort the whole fragment rather than a single
    /// scan range.
    pub fn is_fragment_fatal(&self) -> bool {
        matches!(self, Error::MetadataInconsistency(_) | Error::ScanAborted(_))
    }
}
