//! In-memory file system used by tests and embedders that already hold file
//! contents in memory.

use std::sync::RwLock;

use bytes::Bytes;
use rustc_hash::FxHashMap;
use splitscan_result::{Error, Result};
use splitscan_types::Compression;

use crate::scan_range::ScanRange;
use crate::stream::{FileDescriptor, ScanStream, ScanStreamProvider};

#[derive(Debug, Clone)]
struct MemFile {
    data: Bytes,
    compression: Compression,
}

/// Files keyed by name.
#[derive(Debug, Default)]
pub struct MemFileSystem {
    files: RwLock<FxHashMap<String, MemFile>>,
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, inferring the codec from its name.
    pub fn put(&self, name: impl Into<String>, data: impl Into<Bytes>) -> Result<()> {
        let name = name.into();
        let compression = Compression::from_file_name(&name);
        self.put_with_compression(name, data, compression)
    }

    pub fn put_with_compression(
        &self,
        name: impl Into<String>,
        data: impl Into<Bytes>,
        compression: Compression,
    ) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| Error::poisoned("MemFileSystem files"))?;
        files.insert(
            name.into(),
            MemFile {
                data: data.into(),
                compression,
            },
        );
        Ok(())
    }

    pub fn file_len(&self, name: &str) -> Result<u64> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::poisoned("MemFileSystem files"))?;
        files
            .get(name)
            .map(|file| file.data.len() as u64)
            .ok_or(Error::NotFound)
    }
}

impl ScanStreamProvider for MemFileSystem {
    fn open(&self, range: &ScanRange) -> Result<Box<dyn ScanStream>> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::poisoned("MemFileSystem files"))?;
        let file = files.get(range.file_name()).ok_or(Error::NotFound)?;
        Ok(Box::new(MemStream {
            desc: FileDescriptor {
                file_name: range.file_name().to_string(),
                file_length: file.data.len() as u64,
                compression: file.compression,
            },
            data: file.data.clone(),
            bytes_read: 0,
        }))
    }
}

/// Zero-copy stream over an in-memory file.
#[derive(Debug)]
pub struct MemStream {
    desc: FileDescriptor,
    data: Bytes,
    bytes_read: u64,
}

impl MemStream {
    pub fn new(desc: FileDescriptor, data: Bytes) -> Self {
        Self {
            desc,
            data,
            bytes_read: 0,
        }
    }
}

impl ScanStream for MemStream {
    fn file_desc(&self) -> &FileDescriptor {
        &self.desc
    }

    fn read_at(&mut self, offset: u64, len: usize) -> Result<Bytes> {
        let file_len = self.data.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(file_len);
        let end = start.saturating_add(len).min(file_len);
        let chunk = self.data.slice(start..end);
        self.bytes_read += chunk.len() as u64;
        Ok(chunk)
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_clamped_to_file_end() {
        let fs = MemFileSystem::new();
        fs.put("a.txt", &b"hello world"[..]).unwrap();
        let range = ScanRange::new("a.txt", 6, 100, 0);
        let mut stream = fs.open(&range).unwrap();

        assert_eq!(&stream.read_at(6, 100).unwrap()[..], b"world");
        assert!(stream.read_at(50, 4).unwrap().is_empty());
        assert_eq!(stream.bytes_read(), 5);
        assert_eq!(stream.file_desc().compression, Compression::None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = MemFileSystem::new();
        let range = ScanRange::new("nope", 0, 1, 0);
        assert!(matches!(fs.open(&range), Err(Error::NotFound)));
    }

    #[test]
    fn compression_is_inferred_from_name() {
        let fs = MemFileSystem::new();
        fs.put("part-0.lzo", Bytes::from_static(b"\x89LZO")).unwrap();
        let range = ScanRange::new("part-0.lzo", 0, 4, 0);
        let stream = fs.open(&range).unwrap();
        assert_eq!(stream.file_desc().compression, Compression::Lzo);
        assert_eq!(fs.file_len("part-0.lzo").unwrap(), 4);
    }
}
