#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arrow::datatypes::DataType;
use bytes::Bytes;
use splitscan_result::{Error, Result};
use splitscan_runtime::{BitmapFilter, RuntimeFilterRegistry, RuntimeFilterSource};
use splitscan_scan::{
    FileDescriptor, MemFileSystem, ScanRange, ScanStream, ScanStreamProvider, Scanner,
    ScannerContext, ScannerKind, ScannerRegistry,
};
use splitscan_types::{Literal, SlotId};

pub const SEED: u32 = 0x5eed;

/// Counts every lifecycle call made on recording scanners.
#[derive(Debug, Default)]
pub struct ScannerProbe {
    pub constructed: Mutex<Vec<ScannerKind>>,
    pub prepared: AtomicUsize,
    pub processed: AtomicUsize,
    pub closed: AtomicUsize,
}

impl ScannerProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn constructed(&self) -> Vec<ScannerKind> {
        self.constructed.lock().unwrap().clone()
    }

    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    pub fail_prepare: bool,
    pub fail_process: bool,
    /// Read the whole range during `process`.
    pub read_range: bool,
}

pub struct RecordingScanner {
    kind: ScannerKind,
    probe: Arc<ScannerProbe>,
    behavior: Behavior,
}

impl Scanner for RecordingScanner {
    fn kind(&self) -> ScannerKind {
        self.kind
    }

    fn prepare(&mut self, _ctx: &mut ScannerContext) -> Result<()> {
        self.probe.prepared.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_prepare {
            return Err(Error::scanner_prepare("missing footer"));
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ScannerContext) -> Result<()> {
        self.probe.processed.fetch_add(1, Ordering::SeqCst);
        if self.behavior.read_range {
            let (offset, length) = (ctx.scan_range().offset(), ctx.scan_range().length());
            ctx.stream_mut().read_at(offset, length as usize)?;
        }
        if self.behavior.fail_process {
            return Err(Error::InvalidArgumentError("corrupt block".into()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Registry where every scanner kind is a recording scanner.
pub fn recording_registry(probe: &Arc<ScannerProbe>, behavior: Behavior) -> ScannerRegistry {
    let mut registry = ScannerRegistry::empty();
    for kind in [
        ScannerKind::Text,
        ScannerKind::LzoText,
        ScannerKind::SequenceFile,
        ScannerKind::RcFile,
        ScannerKind::Avro,
        ScannerKind::Parquet,
    ] {
        let probe = Arc::clone(probe);
        registry.register(kind, move || {
            probe.constructed.lock().unwrap().push(kind);
            Box::new(RecordingScanner {
                kind,
                probe: Arc::clone(&probe),
                behavior,
            }) as Box<dyn Scanner>
        });
    }
    registry
}

/// Filter source that records every slot it is asked about.
#[derive(Debug, Default)]
pub struct RecordingFilters {
    inner: RuntimeFilterRegistry,
    lookups: Mutex<Vec<SlotId>>,
}

impl RecordingFilters {
    pub fn new(inner: RuntimeFilterRegistry) -> Self {
        Self {
            inner,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<SlotId> {
        self.lookups.lock().unwrap().clone()
    }
}

impl RuntimeFilterSource for RecordingFilters {
    fn bitmap_filter_count(&self) -> usize {
        self.inner.bitmap_filter_count()
    }

    fn bitmap_filter(&self, slot: SlotId) -> Option<&BitmapFilter> {
        self.lookups.lock().unwrap().push(slot);
        self.inner.bitmap_filter(slot)
    }

    fn fragment_hash_seed(&self) -> u32 {
        self.inner.fragment_hash_seed()
    }
}

/// Filter that admits exactly the given values (modulo collisions).
pub fn filter_admitting(values: &[Literal], data_type: &DataType) -> BitmapFilter {
    let mut filter = BitmapFilter::new(1 << 16).unwrap();
    for value in values {
        filter.insert_literal(value, data_type, SEED).unwrap();
    }
    filter
}

/// Filter with no bits set: rejects everything.
pub fn filter_rejecting_all() -> BitmapFilter {
    BitmapFilter::new(1 << 16).unwrap()
}

/// Stream provider that tallies bytes read across all streams it opened.
pub struct CountingStreams {
    inner: Arc<MemFileSystem>,
    pub opened: AtomicUsize,
    pub bytes_read: Arc<AtomicU64>,
}

impl CountingStreams {
    pub fn new(inner: Arc<MemFileSystem>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            opened: AtomicUsize::new(0),
            bytes_read: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn total_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }
}

impl ScanStreamProvider for CountingStreams {
    fn open(&self, range: &ScanRange) -> Result<Box<dyn ScanStream>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingStream {
            inner: self.inner.open(range)?,
            total: Arc::clone(&self.bytes_read),
        }))
    }
}

struct CountingStream {
    inner: Box<dyn ScanStream>,
    total: Arc<AtomicU64>,
}

impl ScanStream for CountingStream {
    fn file_desc(&self) -> &FileDescriptor {
        self.inner.file_desc()
    }

    fn read_at(&mut self, offset: u64, len: usize) -> Result<Bytes> {
        let chunk = self.inner.read_at(offset, len)?;
        self.total.fetch_add(chunk.len() as u64, Ordering::SeqCst);
        Ok(chunk)
    }

    fn bytes_read(&self) -> u64 {
        self.inner.bytes_read()
    }
}

/// File system holding one file of `len` filler bytes under each name.
pub fn mem_fs_with(files: &[(&str, usize)]) -> Arc<MemFileSystem> {
    let fs = MemFileSystem::new();
    for (name, len) in files {
        fs.put(*name, vec![b'x'; *len]).unwrap();
    }
    Arc::new(fs)
}
