//! Memory-mapped sector source for zero-copy access to image files.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use xtaf_core::{Result, SectorSource, XtafError};

/// Zero-copy sector source using memory mapping.
///
/// No file-position state, so concurrent readers need no lock at all.
///
/// # When to Use
///
/// - Disk image files: always works, best performance
/// - Block devices: may fail; caller should fall back to [`DiskReader`]
///
/// # Safety
///
/// Uses `memmap2::Mmap`, which is safe as long as the underlying file is
/// not modified during the mapping lifetime; the file is opened read-only
/// and the engine never writes.
///
/// [`DiskReader`]: crate::DiskReader
pub struct MmapReader {
    mmap: Mmap,
}

impl MmapReader {
    /// Maps `path` read-only.
    ///
    /// Returns `Err` when the mapping fails or comes back empty (block
    /// devices often "succeed" with an empty mapping); the caller should
    /// fall back to [`DiskReader`].
    ///
    /// [`DiskReader`]: crate::DiskReader
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;

        // SAFETY: the mapping is only ever read, and the source is opened
        // read-only for the lifetime of the process.
        let mmap = unsafe { Mmap::map(&file) }?;
        if mmap.is_empty() {
            return Err(XtafError::Io(std::io::Error::other(
                "mmap returned an empty mapping",
            )));
        }

        #[cfg(target_os = "linux")]
        {
            use memmap2::Advice;
            let _ = mmap.advise(Advice::Random);
        }

        Ok(Self { mmap })
    }

    /// Zero-copy view of up to `length` bytes at `offset`; `None` past EOF.
    #[inline]
    pub fn slice(&self, offset: u64, length: usize) -> Option<&[u8]> {
        let start = offset as usize;
        if start >= self.mmap.len() {
            return None;
        }
        let end = start.saturating_add(length).min(self.mmap.len());
        Some(&self.mmap[start..end])
    }
}

impl SectorSource for MmapReader {
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        Ok(self
            .slice(offset, length)
            .map(<[u8]>::to_vec)
            .unwrap_or_default())
    }

    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}
