//! Error types for the XTAF volume engine.

use thiserror::Error;

/// Errors surfaced by the volume engine and the filesystem adapter.
#[derive(Debug, Error)]
pub enum XtafError {
    /// Underlying read or seek failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Superblock magic is not "XTAF"
    #[error("bad magic (0x{0})")]
    BadMagic(String),

    /// Superblock declares zero sectors per cluster
    #[error("no sector allocated")]
    NoSectors,

    /// Allocation-table bytes are not a multiple of the entry width
    #[error("wrong file allocation table length ({0})")]
    BadTable(usize),

    /// Directory live region is not a multiple of the 64-byte record size
    #[error("wrong directory entries length ({0})")]
    BadDirectory(usize),

    /// Cluster index below 1 or beyond the allocation table
    #[error("unauthorized cluster value ({0})")]
    BadCluster(u32),

    /// Path segment absent from its directory
    #[error("entry \"{0}\" not found")]
    NotFound(String),

    /// Entry used as a directory but the directory bit is clear
    #[error("\"{0}\" is not a directory")]
    NotDirectory(String),

    /// Entry used as a file but the directory bit is set
    #[error("\"{0}\" is a directory")]
    IsDirectory(String),

    /// Path does not start with "/"
    #[error("path name \"{0}\" must start with /")]
    InvalidPath(String),

    /// Read attempted through a deleted entry
    #[error("\"{0}\" is deleted")]
    Deleted(String),
}

impl XtafError {
    /// POSIX errno a mount host should report for this error.
    pub fn errno(&self) -> libc::c_int {
        match self {
            XtafError::NotFound(_) => libc::ENOENT,
            XtafError::NotDirectory(_) => libc::ENOTDIR,
            XtafError::IsDirectory(_) => libc::EISDIR,
            XtafError::InvalidPath(_) => libc::EINVAL,
            XtafError::Deleted(_) => libc::EPERM,
            _ => libc::EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, XtafError>;
