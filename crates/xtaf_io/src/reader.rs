//! Sector source backed by standard file I/O.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;
use xtaf_core::{Result, SectorSource};

/// A read-only sector source for physical disks and disk image files.
///
/// The seek+read pair is stateful, so the file handle sits behind a mutex
/// and concurrent readers serialise on it. Works on anything file-like:
/// - Physical disk devices (`/dev/sdb`, `/dev/nvme0n1`, …)
/// - Partition devices (`/dev/sdb1`, …)
/// - Disk image files (`.img`, `.raw`, …)
///
/// # Example
///
/// ```ignore
/// use xtaf_io::DiskReader;
/// use xtaf_core::SectorSource;
///
/// let reader = DiskReader::open("/dev/sdb")?;
/// let sector = reader.read_at(0, 512)?;
/// ```
pub struct DiskReader {
    file: Mutex<File>,
    size: u64,
}

impl DiskReader {
    /// Opens `path` read-only.
    ///
    /// Fails if the file or device does not exist, permission is denied,
    /// or the size cannot be determined.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(false)
            .open(path.as_ref())?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{Advice, fadvise};

            // directory walks hop between the table and data clusters
            let _ = fadvise(&file, 0, None, Advice::Random);
        }

        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl SectorSource for DiskReader {
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            let read = file.read(&mut buffer[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_reader_basic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let test_data = b"Hello, World! This is test data for DiskReader.";
        temp_file.write_all(test_data).unwrap();
        temp_file.flush().unwrap();
        let reader = DiskReader::open(temp_file.path()).unwrap();

        assert_eq!(reader.size(), test_data.len() as u64);
        assert_eq!(reader.read_at(0, 13).unwrap(), b"Hello, World!");
        assert_eq!(reader.read_at(7, 4).unwrap(), b"Worl");
    }

    #[test]
    fn test_disk_reader_read_beyond_end() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Short").unwrap();
        temp_file.flush().unwrap();

        let reader = DiskReader::open(temp_file.path()).unwrap();

        assert_eq!(reader.read_at(0, 100).unwrap(), b"Short");
        assert!(reader.read_at(50, 10).unwrap().is_empty());
    }
}
