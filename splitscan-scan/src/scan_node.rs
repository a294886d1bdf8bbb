//! Fragment-level dispatch of scan ranges onto a worker pool.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use splitscan_result::{Error, Result};
use splitscan_runtime::{DEFAULT_MAX_ERRORS, FragmentErrorLog};

use crate::processor::{SplitOutcome, SplitProcessor};
use crate::scan_range::{CancelStatus, ScanRange};

/// Knobs of the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanNodeConfig {
    /// Messages kept by the fragment error log.
    pub max_errors: usize,
    /// Abort the scan on the first failed range.
    pub abort_on_error: bool,
    /// Abort once more than this many ranges have failed.
    pub max_failed_ranges: Option<usize>,
    /// Dedicated pool size. `None` runs on Rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for ScanNodeConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            abort_on_error: false,
            max_failed_ranges: None,
            num_threads: None,
        }
    }
}

impl ScanNodeConfig {
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    pub fn with_max_failed_ranges(mut self, limit: usize) -> Self {
        self.max_failed_ranges = Some(limit);
        self
    }

    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }
}

/// Counters accumulated over every `scan` call of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub ranges_completed: u64,
    pub ranges_pruned: u64,
    pub ranges_failed: u64,
    /// Ranges never processed because the node was cancelled or aborted.
    pub ranges_skipped: u64,
    pub rows: u64,
    pub bytes: u64,
}

#[derive(Debug, Default)]
struct ScanStats {
    completed: AtomicU64,
    pruned: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    rows: AtomicU64,
    bytes: AtomicU64,
}

impl ScanStats {
    fn snapshot(&self) -> ScanSummary {
        ScanSummary {
            ranges_completed: self.completed.load(Ordering::Relaxed),
            ranges_pruned: self.pruned.load(Ordering::Relaxed),
            ranges_failed: self.failed.load(Ordering::Relaxed),
            ranges_skipped: self.skipped.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Runs a [`SplitProcessor`] over many scan ranges in parallel.
pub struct ScanNode {
    processor: Arc<SplitProcessor>,
    config: ScanNodeConfig,
    pool: Option<rayon::ThreadPool>,
    error_log: Arc<FragmentErrorLog>,
    cancelled: AtomicBool,
    stats: ScanStats,
}

impl ScanNode {
    pub fn new(processor: Arc<SplitProcessor>, config: ScanNodeConfig) -> Result<Self> {
        let pool = match config.num_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("splitscan-worker-{i}"))
                    .build()
                    .map_err(|err| Error::Internal(format!("failed to build scan pool: {err}")))?,
            ),
            None => None,
        };
        Ok(Self {
            processor,
            error_log: Arc::new(FragmentErrorLog::new(config.max_errors)),
            config,
            pool,
            cancelled: AtomicBool::new(false),
            stats: ScanStats::default(),
        })
    }

    pub fn config(&self) -> &ScanNodeConfig {
        &self.config
    }

    pub fn error_log(&self) -> &Arc<FragmentErrorLog> {
        &self.error_log
    }

    /// Stop dispatching. Ranges not yet started are cancelled benignly.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn summary(&self) -> ScanSummary {
        self.stats.snapshot()
    }

    /// Process every range and return the accumulated counters.
    ///
    /// Per-range failures are recorded in the error log and counted. The
    /// scan only fails on a fragment-fatal error or when the failure
    /// threshold is crossed; every range is still either processed or
    /// cancelled before this returns.
    pub fn scan(&self, ranges: &[Arc<ScanRange>]) -> Result<ScanSummary> {
        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        let run = || {
            ranges.par_iter().for_each(|range| {
                if let Err(err) = self.dispatch(range) {
                    self.cancel();
                    if let Ok(mut slot) = first_error.lock()
                        && slot.is_none()
                    {
                        *slot = Some(err);
                    }
                }
            });
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }

        let first_error = first_error
            .into_inner()
            .map_err(|_| Error::poisoned("scan node first error"))?;
        let summary = self.summary();
        match first_error {
            Some(err) => {
                tracing::error!(error = %err, ?summary, "scan aborted");
                Err(err)
            }
            None => {
                tracing::debug!(?summary, "scan finished");
                Ok(summary)
            }
        }
    }

    fn dispatch(&self, range: &Arc<ScanRange>) -> Result<()> {
        if self.is_cancelled() {
            range.cancel(CancelStatus::Cancelled);
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let outcome = match self.processor.process(range, self.error_log.as_ref()) {
            Ok(outcome) => outcome,
            Err(err) => {
                if !range.is_cancelled() {
                    range.cancel(CancelStatus::Error(err.to_string()));
                }
                return Err(err);
            }
        };
        match outcome {
            SplitOutcome::Completed { rows, bytes } => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                self.stats.rows.fetch_add(rows, Ordering::Relaxed);
                self.stats.bytes.fetch_add(bytes, Ordering::Relaxed);
            }
            SplitOutcome::Pruned => {
                self.stats.pruned.fetch_add(1, Ordering::Relaxed);
            }
            SplitOutcome::Failed { error, .. } => {
                let failed = self.stats.failed.fetch_add(1, Ordering::Relaxed) + 1;
                if self.config.abort_on_error {
                    return Err(Error::ScanAborted(format!(
                        "scan range {range} failed: {error}"
                    )));
                }
                if let Some(limit) = self.config.max_failed_ranges
                    && failed > limit as u64
                {
                    return Err(Error::ScanAborted(format!(
                        "{failed} scan ranges failed, limit is {limit}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ScanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanNode")
            .field("config", &self.config)
            .field("cancelled", &self.is_cancelled())
            .field("summary", &self.summary())
            .finish()
    }
}
