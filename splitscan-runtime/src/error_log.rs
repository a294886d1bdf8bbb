//! Fragment-level error log and the diagnostics sink the scan path reports to.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use splitscan_result::{Error, Result};

/// Phase in which a scan range failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Scanner construction or prepare (no data read).
    Prepare,
    /// Scanner processing.
    Process,
}

/// Context reported for a failed scan range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDiagnostic {
    pub file_name: String,
    pub offset: u64,
    pub length: u64,
    pub phase: FailurePhase,
    /// Bytes consumed before the failure; only reported for process failures.
    pub bytes_processed: Option<u64>,
    pub error: String,
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            FailurePhase::Prepare => write!(
                f,
                "Error preparing scanner for scan range {}({}:{}). {}",
                self.file_name, self.offset, self.length, self.error
            ),
            FailurePhase::Process => write!(
                f,
                "Scan node ran into a parse error for scan range {}({}:{}). Processed {} bytes. {}",
                self.file_name,
                self.offset,
                self.length,
                self.bytes_processed.unwrap_or(0),
                self.error
            ),
        }
    }
}

/// Receives scan-path diagnostics. Passed explicitly into the split
/// processor so the scan path holds no global state.
pub trait DiagnosticsSink: Send + Sync {
    /// Rendered fragment error log, empty when nothing has been logged.
    fn error_log(&self) -> Result<String>;

    /// Append a message to the fragment error log.
    fn log_error(&self, message: String) -> Result<()>;

    /// Record a failed scan range. Only the per-range line enters the log.
    fn report(&self, diagnostic: ScanDiagnostic) -> Result<()>;
}

/// Bounded fragment error log.
///
/// Keeps the first `max_errors` messages and diagnostics and counts the
/// rest.
#[derive(Debug)]
pub struct FragmentErrorLog {
    max_errors: usize,
    messages: Mutex<Vec<String>>,
    diagnostics: Mutex<Vec<ScanDiagnostic>>,
    error_count: AtomicU64,
}

/// Default bound on retained messages.
pub const DEFAULT_MAX_ERRORS: usize = 100;

impl Default for FragmentErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERRORS)
    }
}

impl FragmentErrorLog {
    pub fn new(max_errors: usize) -> Self {
        Self {
            max_errors,
            messages: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicU64::new(0),
        }
    }

    /// Every message logged, including those dropped by the bound.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn messages(&self) -> Result<Vec<String>> {
        let messages = self
            .messages
            .lock()
            .map_err(|_| Error::poisoned("fragment error log"))?;
        Ok(messages.clone())
    }

    pub fn diagnostics(&self) -> Result<Vec<ScanDiagnostic>> {
        let diagnostics = self
            .diagnostics
            .lock()
            .map_err(|_| Error::poisoned("fragment diagnostics"))?;
        Ok(diagnostics.clone())
    }
}

impl DiagnosticsSink for FragmentErrorLog {
    fn error_log(&self) -> Result<String> {
        let messages = self
            .messages
            .lock()
            .map_err(|_| Error::poisoned("fragment error log"))?;
        let mut rendered = messages.join("\n");
        let dropped = self.error_count().saturating_sub(messages.len() as u64);
        if dropped > 0 {
            rendered.push_str(&format!("\n({dropped} more errors not shown)"));
        }
        Ok(rendered)
    }

    fn log_error(&self, message: String) -> Result<()> {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| Error::poisoned("fragment error log"))?;
        if messages.len() < self.max_errors {
            messages.push(message);
        }
        Ok(())
    }

    fn report(&self, diagnostic: ScanDiagnostic) -> Result<()> {
        self.log_error(diagnostic.to_string())?;
        tracing::warn!(
            file = %diagnostic.file_name,
            offset = diagnostic.offset,
            length = diagnostic.length,
            phase = ?diagnostic.phase,
            error_log = %self.error_log()?,
            "{}",
            diagnostic.error
        );
        let mut diagnostics = self
            .diagnostics
            .lock()
            .map_err(|_| Error::poisoned("fragment diagnostics"))?;
        if diagnostics.len() < self.max_errors {
            diagnostics.push(diagnostic);
        }
        Ok(())
    }
}
