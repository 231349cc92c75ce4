//! Sector-source abstraction and the offset-addressed block device.

use crate::drive::DriveInfo;
use crate::error::Result;

/// Device-level unit; everything above it is measured in clusters.
pub const SECTOR_SIZE: u64 = 0x200;

/// A source of raw bytes, typically a disk or image file.
///
/// Implementations must be safe to share between readers: `read_at` takes
/// `&self`, so a stateful seek+read pair has to be serialised internally
/// (or backed by a stateless mapping).
///
/// # Example
///
/// ```ignore
/// let source = xtaf_io::DiskReader::open("/dev/sdb")?;
/// let sector = source.read_at(0, 512)?;
/// ```
pub trait SectorSource: Send + Sync {
    /// Reads up to `length` bytes at `offset`.
    ///
    /// Returns fewer bytes than requested only at the end of the source.
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>>;

    /// Total size of the source in bytes.
    fn size(&self) -> u64;
}

/// A sector source addressed relative to a configurable base offset.
///
/// The base offset and the default read length are the only mutable
/// configuration; the source itself is opened once and never reopened.
#[derive(Debug)]
pub struct BlockDevice<S> {
    source: S,
    base_offset: u64,
    default_length: u64,
    size: u64,
    drive: Option<DriveInfo>,
}

impl<S: SectorSource> BlockDevice<S> {
    /// Wraps `source`, probing the security sector for drive metadata.
    ///
    /// The device size is the sector count recorded in the security sector
    /// when present (raw drives), the source size otherwise (image dumps).
    pub fn new(source: S) -> Result<Self> {
        let drive = DriveInfo::probe(&source)?;
        let size = drive.as_ref().map_or(source.size(), DriveInfo::capacity);
        Ok(Self {
            source,
            base_offset: 0,
            default_length: SECTOR_SIZE,
            size,
            drive,
        })
    }

    pub fn set_base_offset(&mut self, offset: u64) {
        self.base_offset = offset;
    }

    pub fn set_default_length(&mut self, length: u64) {
        self.default_length = length;
    }

    /// Device size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Drive metadata, absent on image dumps.
    pub fn drive(&self) -> Option<&DriveInfo> {
        self.drive.as_ref()
    }

    /// Reads `length` bytes at `offset` relative to the base offset.
    /// A length of 0 reads the default length.
    pub fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let absolute = self.base_offset + offset;
        let length = if length == 0 { self.default_length } else { length };
        log::debug!("reading {} bytes at offset {:#x}", length, absolute);
        self.source.read_at(absolute, length as usize)
    }
}
