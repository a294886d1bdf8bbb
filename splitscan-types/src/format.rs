//! File formats and compression codecs a partition's files can carry.

use std::fmt;

/// On-disk format of every file in a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Text,
    SequenceFile,
    RcFile,
    Avro,
    /// Columnar format. The only one eligible for bitmap-filter pruning.
    Parquet,
    /// A format code the catalog knows but this build does not.
    Unknown(i32),
}

impl FileFormat {
    /// Map the catalog's numeric format code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => FileFormat::Text,
            2 => FileFormat::RcFile,
            3 => FileFormat::SequenceFile,
            4 => FileFormat::Avro,
            5 => FileFormat::Parquet,
            other => FileFormat::Unknown(other),
        }
    }

    pub fn is_columnar(self) -> bool {
        matches!(self, FileFormat::Parquet)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Text => f.write_str("TEXT"),
            FileFormat::SequenceFile => f.write_str("SEQUENCE_FILE"),
            FileFormat::RcFile => f.write_str("RC_FILE"),
            FileFormat::Avro => f.write_str("AVRO"),
            FileFormat::Parquet => f.write_str("PARQUET"),
            FileFormat::Unknown(code) => write!(f, "{code}"),
        }
    }
}

/// Compression codec of a single file, reported by the I/O layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Default,
    Gzip,
    Deflate,
    Bzip2,
    Snappy,
    SnappyBlocked,
    Lzo,
    Lz4,
    Zlib,
}

impl Compression {
    /// Guess the codec from a file name suffix, the way text tables are laid
    /// out on disk.
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("gz") => Compression::Gzip,
            Some("deflate") => Compression::Deflate,
            Some("bz2") => Compression::Bzip2,
            Some("snappy") => Compression::Snappy,
            Some("lzo") => Compression::Lzo,
            Some("lz4") => Compression::Lz4,
            _ => Compression::None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "NONE",
            Compression::Default => "DEFAULT",
            Compression::Gzip => "GZIP",
            Compression::Deflate => "DEFLATE",
            Compression::Bzip2 => "BZIP2",
            Compression::Snappy => "SNAPPY",
            Compression::SnappyBlocked => "SNAPPY_BLOCKED",
            Compression::Lzo => "LZO",
            Compression::Lz4 => "LZ4",
            Compression::Zlib => "ZLIB",
        };
        f.write_str(name)
    }
}
