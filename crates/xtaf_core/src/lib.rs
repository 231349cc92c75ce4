//! # xtaf_core
//!
//! Read-only engine for the XTAF ("FATX") filesystem used on Xbox 360
//! hard drives: security-sector probing, superblock and allocation-table
//! loading, directory decoding with deleted-entry recovery, cluster-chain
//! file reads, and a POSIX-shaped adapter a mount host can sit on.
//!
//! ## Key Components
//!
//! - **SectorSource / BlockDevice**: byte access with a configurable base
//!   offset, so the same engine reads raw drives and partition images
//! - **Volume**: an opened partition; directory tree, path resolution and
//!   file reads, immutable after construction
//! - **XtafFs**: `getattr` / `readdir` / `read` over absolute paths,
//!   with errors mapped to POSIX errno values
//!
//! ## Example
//!
//! ```ignore
//! use xtaf_core::{Volume, XtafFs, DATA_OFFSET};
//!
//! let source = xtaf_io::DiskReader::open("/dev/sdb")?;
//! let volume = Volume::open(source, DATA_OFFSET, 0)?;
//! let fs = XtafFs::new(volume);
//! for name in fs.readdir("/")? {
//!     println!("{name}");
//! }
//! ```

mod device;
mod drive;
mod entry;
mod error;
mod fs;
mod superblock;
mod table;
#[cfg(test)]
pub(crate) mod testutil;
mod volume;

pub use device::{BlockDevice, SECTOR_SIZE, SectorSource};
pub use drive::DriveInfo;
pub use entry::{DIRECTORY_ATTRIBUTE, DirectoryEntry, ENTRY_SIZE, EntryName, FatTimestamp};
pub use error::{Result, XtafError};
pub use fs::{FileStat, XtafFs};
pub use superblock::{SUPERBLOCK_SIZE, Superblock};
pub use table::{AllocationTable, EntryWidth, TABLE_OFFSET};
pub use volume::{
    COMPAT_OFFSET, DATA_OFFSET, Directory, FileChunks, SYSEXT1_OFFSET, SYSEXT2_OFFSET, Volume,
};
