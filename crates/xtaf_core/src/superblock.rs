//! XTAF partition superblock.

use crate::device::SECTOR_SIZE;
use crate::error::{Result, XtafError};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// On-disk size of the header at the partition base.
pub const SUPERBLOCK_SIZE: usize = 0x10;

const XTAF_MAGIC: [u8; 4] = *b"XTAF";

/// The 16-byte big-endian header at the base of every XTAF partition.
#[derive(Debug, Clone)]
pub struct Superblock {
    pub volume_id: u32,
    pub sectors_per_cluster: u32,
    pub root_cluster: u32,
}

impl Superblock {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != XTAF_MAGIC {
            return Err(XtafError::BadMagic(hex::encode(magic)));
        }

        let volume_id = cursor.read_u32::<BigEndian>()?;
        let sectors_per_cluster = cursor.read_u32::<BigEndian>()?;
        let root_cluster = cursor.read_u32::<BigEndian>()?;
        if sectors_per_cluster == 0 {
            return Err(XtafError::NoSectors);
        }

        Ok(Self {
            volume_id,
            sectors_per_cluster,
            root_cluster,
        })
    }

    /// Allocation unit in bytes.
    pub fn cluster_size(&self) -> u64 {
        u64::from(self.sectors_per_cluster) * SECTOR_SIZE
    }
}
