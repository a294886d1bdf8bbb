//! Format-specific readers and the machinery that picks and owns them.

mod factory;
mod registry;
mod text;

pub use factory::{ScannerFactory, scanner_kind_for};
pub use registry::{ScannerConstructor, ScannerRegistry};
pub use text::TextScanner;

use std::fmt;

use splitscan_result::{Error, Result};

use crate::context::ScannerContext;

/// Closed set of reader implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    Text,
    /// LZO-compressed text. Provided by an optional plugin.
    LzoText,
    SequenceFile,
    RcFile,
    Avro,
    Parquet,
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScannerKind::Text => "text",
            ScannerKind::LzoText => "LZO text",
            ScannerKind::SequenceFile => "sequence file",
            ScannerKind::RcFile => "RC file",
            ScannerKind::Avro => "Avro",
            ScannerKind::Parquet => "Parquet",
        };
        f.write_str(name)
    }
}

/// A stateful reader for one scan range.
///
/// `prepare` and `process` may read through the context's stream. `close`
/// releases everything the scanner holds and must tolerate being called on a
/// scanner that was never prepared.
pub trait Scanner: Send {
    fn kind(&self) -> ScannerKind;

    fn prepare(&mut self, ctx: &mut ScannerContext) -> Result<()>;

    /// Decode the whole scan range, pushing rows to the context's sink.
    fn process(&mut self, ctx: &mut ScannerContext) -> Result<()>;

    fn close(&mut self);
}

/// Lifecycle of a scanner owned by a [`ScannerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Created,
    Prepared,
    Processing,
    Closed,
}

/// Owns a scanner and closes it exactly once, either through [`close`] or on
/// drop.
///
/// [`close`]: ScannerHandle::close
pub struct ScannerHandle {
    scanner: Box<dyn Scanner>,
    state: ScannerState,
}

impl ScannerHandle {
    pub(crate) fn new(scanner: Box<dyn Scanner>) -> Self {
        Self {
            scanner,
            state: ScannerState::Created,
        }
    }

    pub fn kind(&self) -> ScannerKind {
        self.scanner.kind()
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub(crate) fn prepare(&mut self, ctx: &mut ScannerContext) -> Result<()> {
        if self.state != ScannerState::Created {
            return Err(Error::Internal(format!(
                "cannot prepare {} scanner in state {:?}",
                self.kind(),
                self.state
            )));
        }
        self.scanner.prepare(ctx)?;
        self.state = ScannerState::Prepared;
        Ok(())
    }

    pub fn process(&mut self, ctx: &mut ScannerContext) -> Result<()> {
        if self.state != ScannerState::Prepared {
            return Err(Error::Internal(format!(
                "cannot process with {} scanner in state {:?}",
                self.kind(),
                self.state
            )));
        }
        self.state = ScannerState::Processing;
        self.scanner.process(ctx)
    }

    /// Close the scanner now.
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if self.state != ScannerState::Closed {
            self.scanner.close();
            self.state = ScannerState::Closed;
        }
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.close_once();
    }
}

impl fmt::Debug for ScannerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerHandle")
            .field("kind", &self.kind())
            .field("state", &self.state)
            .finish()
    }
}
