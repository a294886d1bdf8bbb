use splitscan_result::{Error, Result};
use splitscan_runtime::{DebugActions, ExecNodePhase};
use splitscan_types::{Compression, FileFormat};

use super::registry::ScannerRegistry;
use super::{ScannerHandle, ScannerKind};
use crate::context::ScannerContext;
use crate::partition::PartitionDescriptor;

#[derive(Debug, Clone, Copy)]
enum CompressionMatch {
    Exactly(Compression),
    Any,
}

impl CompressionMatch {
    fn matches(self, compression: Compression) -> bool {
        match self {
            CompressionMatch::Exactly(expected) => expected == compression,
            CompressionMatch::Any => true,
        }
    }
}

/// First matching row wins.
const DISPATCH: &[(FileFormat, CompressionMatch, ScannerKind)] = &[
    (
        FileFormat::Text,
        CompressionMatch::Exactly(Compression::Lzo),
        ScannerKind::LzoText,
    ),
    (FileFormat::Text, CompressionMatch::Any, ScannerKind::Text),
    (
        FileFormat::SequenceFile,
        CompressionMatch::Any,
        ScannerKind::SequenceFile,
    ),
    (FileFormat::RcFile, CompressionMatch::Any, ScannerKind::RcFile),
    (FileFormat::Avro, CompressionMatch::Any, ScannerKind::Avro),
    (FileFormat::Parquet, CompressionMatch::Any, ScannerKind::Parquet),
];

/// Scanner kind for a partition format and a file's compression.
pub fn scanner_kind_for(format: FileFormat, compression: Compression) -> Result<ScannerKind> {
    DISPATCH
        .iter()
        .find(|(f, c, _)| *f == format && c.matches(compression))
        .map(|(_, _, kind)| *kind)
        .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))
}

/// Picks, builds and prepares the scanner for a scan range.
#[derive(Debug, Clone)]
pub struct ScannerFactory {
    registry: ScannerRegistry,
    debug_actions: DebugActions,
}

impl Default for ScannerFactory {
    fn default() -> Self {
        Self::new(ScannerRegistry::with_builtin())
    }
}

impl ScannerFactory {
    pub fn new(registry: ScannerRegistry) -> Self {
        Self {
            registry,
            debug_actions: DebugActions::none(),
        }
    }

    pub fn with_debug_actions(mut self, debug_actions: DebugActions) -> Self {
        self.debug_actions = debug_actions;
        self
    }

    pub fn registry(&self) -> &ScannerRegistry {
        &self.registry
    }

    /// Build the scanner for `partition`'s format and the stream's
    /// compression, then prepare it against `ctx`.
    ///
    /// On any failure after construction the scanner is closed here and never
    /// returned. Nothing is read from the stream before `prepare`, and the
    /// partition's template tuple is never touched.
    pub fn create_and_prepare(
        &self,
        partition: &PartitionDescriptor,
        ctx: &mut ScannerContext,
    ) -> Result<ScannerHandle> {
        let compression = ctx.stream().file_desc().compression;
        let kind = scanner_kind_for(partition.file_format(), compression)?;
        let mut handle = ScannerHandle::new(self.registry.construct(kind)?);

        tracing::trace!(
            %kind,
            partition = partition.id(),
            file = ctx.scan_range().file_name(),
            "constructed scanner"
        );

        // Dropping the handle closes the scanner.
        self.debug_actions
            .fire(ExecNodePhase::PrepareScanner)
            .map_err(Error::into_prepare_failure)?;
        handle
            .prepare(ctx)
            .map_err(Error::into_prepare_failure)?;
        Ok(handle)
    }
}
