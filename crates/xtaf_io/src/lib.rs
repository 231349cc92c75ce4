//! # xtaf_io
//!
//! Sector-source implementations for the XTAF volume engine.
//!
//! This crate provides concrete implementations of the `SectorSource`
//! trait defined in `xtaf_core`, reading raw bytes from physical drives
//! and disk image files.
//!
//! ## Key Components
//!
//! - **DiskReader**: read-only source using standard file I/O
//! - **MmapReader**: zero-copy source using memory mapping (preferred)
//! - **Source**: tries mmap first and falls back to file I/O
//!
//! ## Example
//!
//! ```ignore
//! use xtaf_io::Source;
//! use xtaf_core::{Volume, DATA_OFFSET};
//!
//! let source = Source::open("/dev/sdb")?;
//! let volume = Volume::open(source, DATA_OFFSET, 0)?;
//! ```

mod mmap_reader;
mod reader;

pub use mmap_reader::MmapReader;
pub use reader::DiskReader;

use std::path::Path;
use xtaf_core::{Result, SectorSource};

/// The reader actually chosen for a path.
pub enum Source {
    Mmap(MmapReader),
    Disk(DiskReader),
}

impl Source {
    /// Opens `path`, preferring mmap and falling back to standard file
    /// I/O for block devices that refuse to map.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match MmapReader::open(path) {
            Ok(reader) => Ok(Source::Mmap(reader)),
            Err(_) => Ok(Source::Disk(DiskReader::open(path)?)),
        }
    }

    /// Returns true if this source is memory-mapped.
    #[inline]
    pub fn is_mmap(&self) -> bool {
        matches!(self, Source::Mmap(_))
    }
}

impl SectorSource for Source {
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        match self {
            Source::Mmap(reader) => reader.read_at(offset, length),
            Source::Disk(reader) => reader.read_at(offset, length),
        }
    }

    fn size(&self) -> u64 {
        match self {
            Source::Mmap(reader) => reader.size(),
            Source::Disk(reader) => reader.size(),
        }
    }
}
