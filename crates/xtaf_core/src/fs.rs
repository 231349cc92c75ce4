//! Read-only filesystem adapter over a [`Volume`].
//!
//! Translates path-indexed `getattr` / `readdir` / `read` requests into
//! volume operations, the surface a mount host (FUSE or similar) expects.
//! Mount runtimes may call from several threads at once; everything here
//! is `&self` and the only post-construction mutation, the cluster-chain
//! memo, sits behind a mutex.

use crate::device::SectorSource;
use crate::entry::{DirectoryEntry, FatTimestamp};
use crate::error::{Result, XtafError};
use crate::volume::Volume;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

const DIR_MODE: u32 = 0o40555;
const FILE_MODE: u32 = 0o100444;
const DELETED_MODE: u32 = 0o100000;

/// Distinct live files comfortably fit; the memo resets if they do not.
const CHAIN_MEMO_LIMIT: usize = 1024;

/// POSIX-style attributes answered by `getattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub ctime: i64,
    pub mtime: i64,
    pub atime: i64,
}

/// The mountable face of a volume.
pub struct XtafFs<S> {
    volume: Volume<S>,
    uid: u32,
    gid: u32,
    ctime: i64,
    chains: Mutex<HashMap<u32, Vec<u32>>>,
}

impl<S: SectorSource> XtafFs<S> {
    pub fn new(volume: Volume<S>) -> Self {
        Self {
            volume,
            uid: rustix::process::getuid().as_raw(),
            gid: rustix::process::getgid().as_raw(),
            ctime: Utc::now().timestamp(),
            chains: Mutex::new(HashMap::new()),
        }
    }

    pub fn volume(&self) -> &Volume<S> {
        &self.volume
    }

    /// Attributes for `path`. Directories report the cluster size as their
    /// size; deleted entries report no size and an unreadable mode.
    pub fn getattr(&self, path: &str) -> Result<FileStat> {
        let mut stat = FileStat {
            mode: DIR_MODE,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            size: self.volume.cluster_size(),
            ctime: self.ctime,
            mtime: self.ctime,
            atime: self.ctime,
        };
        if path == "/" {
            return Ok(stat);
        }

        let entry = self.volume.resolve(path)?;
        let ctime = timestamp_secs(entry.created);
        let mtime = timestamp_secs(entry.modified);
        stat.ctime = ctime;
        stat.mtime = mtime;
        stat.atime = ctime.max(mtime);
        if entry.is_directory() {
            return Ok(stat);
        }

        stat.nlink = 1;
        stat.size = entry.read_size();
        stat.mode = if entry.is_deleted() {
            DELETED_MODE
        } else {
            FILE_MODE
        };
        Ok(stat)
    }

    /// Names in the directory at `path`, after "." and "..".
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let mut listing = vec![".".to_string(), "..".to_string()];
        if path == "/" {
            listing.extend(self.volume.root().keys().cloned());
        } else {
            let entry = self.volume.resolve(path)?;
            listing.extend(self.volume.read_directory(&entry)?.keys().cloned());
        }
        Ok(listing)
    }

    /// Up to `size` bytes of the file at `path`, starting at `offset`.
    /// Deleted entries are refused outright.
    pub fn read(&self, path: &str, size: u64, offset: u64) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let entry = self.volume.resolve(path)?;
        if entry.is_deleted() {
            return Err(XtafError::Deleted(entry.name.to_string()));
        }
        if entry.is_directory() {
            return Err(XtafError::IsDirectory(entry.name.to_string()));
        }
        if offset >= entry.read_size() {
            return Ok(Vec::new());
        }
        let clusters = self.chain_for(&entry)?;
        self.volume
            .window(&clusters, entry.read_size(), offset, size)
    }

    /// Everything on the volume is world-readable; nothing to check.
    pub fn access(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn chain_for(&self, entry: &DirectoryEntry) -> Result<Vec<u32>> {
        let mut chains = self
            .chains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(chain) = chains.get(&entry.first_cluster) {
            return Ok(chain.clone());
        }
        let chain = self.volume.clusters(entry)?;
        if chains.len() >= CHAIN_MEMO_LIMIT {
            chains.clear();
        }
        chains.insert(entry.first_cluster, chain.clone());
        Ok(chain)
    }
}

/// Maps an on-disk timestamp to Unix seconds, clamping components the
/// format allows but the calendar does not (month 0, day 31 in June, …).
fn timestamp_secs(ts: FatTimestamp) -> i64 {
    let year = i32::from(ts.year);
    let month = u32::from(ts.month).clamp(1, 12);
    let day = u32::from(ts.day).max(1);
    let date = (0..4)
        .filter_map(|back| NaiveDate::from_ymd_opt(year, month, day.saturating_sub(back).max(1)))
        .next()
        .unwrap_or_default();
    let time = NaiveTime::from_hms_opt(
        u32::from(ts.hour).min(23),
        u32::from(ts.minute).min(59),
        u32::from(ts.second).min(59),
    )
    .unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ImageBuilder, MemSource, deleted_record, raw_record};

    fn sample_fs() -> XtafFs<MemSource> {
        let mut image = ImageBuilder::new(1, 1, 1, 0x2_0000);
        image.set_table(1, 0xFFFF);
        image.set_table(2, 0xFFFF);
        image.set_table(3, 0x0004);
        image.set_table(4, 0xFFFF);
        image.set_table(5, 0xFFFF);
        image.fill_cluster(1, 0xFF);
        image.fill_cluster(2, 0xFF);
        image.put_record(1, 0, &raw_record("saves", 0x10, 2, 0));
        image.put_record(1, 1, &raw_record("data.bin", 0x00, 3, 600));
        image.put_record(1, 2, &deleted_record(b"gone.dat", 0x00, 5, 77));
        let mut content = Vec::new();
        for index in 0..600u32 {
            content.push((index % 199) as u8);
        }
        image.put_cluster(3, &content[..512]);
        image.put_cluster(4, &content[512..]);
        let volume = Volume::open(MemSource(image.into_bytes()), 0, 0).unwrap();
        XtafFs::new(volume)
    }

    #[test]
    fn test_getattr_root() {
        let fs = sample_fs();
        let stat = fs.getattr("/").unwrap();
        assert_eq!(stat.mode, 0o40555);
        assert_eq!(stat.nlink, 2);
        assert_eq!(stat.size, 512);
        assert_eq!(stat.atime, stat.ctime);
    }

    #[test]
    fn test_getattr_directory() {
        let fs = sample_fs();
        let stat = fs.getattr("/saves").unwrap();
        assert_eq!(stat.mode, 0o40555);
        assert_eq!(stat.nlink, 2);
        assert_eq!(stat.size, 512);
    }

    #[test]
    fn test_getattr_file() {
        let fs = sample_fs();
        let stat = fs.getattr("/data.bin").unwrap();
        assert_eq!(stat.mode, 0o100444);
        assert_eq!(stat.nlink, 1);
        assert_eq!(stat.size, 600);
        // 2024-06-15 12:30:20, from the record's FAT fields
        assert_eq!(stat.ctime, 1_718_454_620);
        assert_eq!(stat.mtime, 1_718_454_620);
        assert_eq!(stat.atime, 1_718_454_620);
    }

    #[test]
    fn test_getattr_deleted() {
        let fs = sample_fs();
        let stat = fs.getattr("/<DELETED:gone.dat>").unwrap();
        assert_eq!(stat.mode, 0o100000);
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn test_getattr_missing() {
        let fs = sample_fs();
        let err = fs.getattr("/nope").unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn test_readdir_root() {
        let fs = sample_fs();
        let listing = fs.readdir("/").unwrap();
        assert_eq!(listing[0], ".");
        assert_eq!(listing[1], "..");
        assert!(listing.contains(&"saves".to_string()));
        assert!(listing.contains(&"data.bin".to_string()));
        assert!(listing.contains(&"<DELETED:gone.dat>".to_string()));
        assert_eq!(listing.len(), 5);
    }

    #[test]
    fn test_readdir_subdirectory() {
        let fs = sample_fs();
        assert_eq!(fs.readdir("/saves").unwrap(), vec![".", ".."]);
    }

    #[test]
    fn test_readdir_file_fails() {
        let fs = sample_fs();
        let err = fs.readdir("/data.bin").unwrap_err();
        assert_eq!(err.errno(), libc::ENOTDIR);
    }

    #[test]
    fn test_read_windows_match_content() {
        let fs = sample_fs();
        let full = fs.read("/data.bin", 4096, 0).unwrap();
        assert_eq!(full.len(), 600);
        assert_eq!(fs.read("/data.bin", 10, 500).unwrap(), &full[500..510]);
        assert_eq!(fs.read("/data.bin", 64, 511).unwrap(), &full[511..575]);
        assert!(fs.read("/data.bin", 10, 600).unwrap().is_empty());
        assert!(fs.read("/data.bin", 0, 0).unwrap().is_empty());
        // memoised chain answers repeated reads
        assert_eq!(fs.read("/data.bin", 10, 500).unwrap(), &full[500..510]);
    }

    #[test]
    fn test_read_deleted_refused() {
        let fs = sample_fs();
        let err = fs.read("/<DELETED:gone.dat>", 10, 0).unwrap_err();
        assert_eq!(err.errno(), libc::EPERM);
    }

    #[test]
    fn test_read_directory_refused() {
        let fs = sample_fs();
        let err = fs.read("/saves", 10, 0).unwrap_err();
        assert_eq!(err.errno(), libc::EISDIR);
    }

    #[test]
    fn test_access_always_allowed() {
        let fs = sample_fs();
        assert!(fs.access("/").is_ok());
        assert!(fs.access("/data.bin").is_ok());
    }

    #[test]
    fn test_timestamp_clamps_out_of_range() {
        // month 0 / day 0 clamps to 1980-01-01
        let zero = FatTimestamp::from_raw(0, 0);
        assert_eq!(timestamp_secs(zero), 315_532_800);
        // June 31st slides back to the 30th
        let ts = FatTimestamp {
            year: 2024,
            month: 6,
            day: 31,
            hour: 0,
            minute: 0,
            second: 0,
        };
        let slid = FatTimestamp { day: 30, ..ts };
        assert_eq!(timestamp_secs(ts), timestamp_secs(slid));
    }
}
