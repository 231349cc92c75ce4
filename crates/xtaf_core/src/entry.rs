//! 64-byte XTAF directory records.

use crate::error::Result;
use byteorder::{BigEndian, ReadBytesExt};
use std::fmt;
use std::io::{Cursor, Read};

/// On-disk size of a directory record.
pub const ENTRY_SIZE: usize = 0x40;

/// Attribute bit marking a directory.
pub const DIRECTORY_ATTRIBUTE: u8 = 0x10;

/// A record starting with this byte ends the directory scan.
pub const FREE_NAME_LENGTH: u8 = 0xFF;

const NAME_FIELD_LEN: usize = 0x2A;
const MAX_NAME_LEN: u8 = 0x2A;

/// FAT date/time fields as found on disk.
///
/// Components are not validated here; a month of 0 passes through and the
/// consumer clamps when mapping to a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FatTimestamp {
    pub fn from_raw(date: u16, time: u16) -> Self {
        Self {
            year: 1980 + (date >> 9),
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: (time >> 11) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        }
    }
}

/// A record name: live ASCII, or the preserved bytes of a deleted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName {
    Live(String),
    /// Raw name bytes with the trailing 0xFF padding stripped.
    Deleted(Vec<u8>),
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryName::Live(name) => f.write_str(name),
            EntryName::Deleted(raw) => match std::str::from_utf8(raw) {
                Ok(name) if name.is_ascii() => write!(f, "<DELETED:{}>", name),
                _ => write!(f, "<DELETED:{}>", hex::encode(raw)),
            },
        }
    }
}

/// A decoded directory record.
///
/// Deleted records keep their attribute, cluster and size fields for
/// inspection, but reads through them always see an empty file.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: EntryName,
    pub attributes: u8,
    pub first_cluster: u32,
    pub size: u32,
    pub created: FatTimestamp,
    pub modified: FatTimestamp,
}

impl DirectoryEntry {
    /// Decodes one 64-byte record.
    pub fn parse(record: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(record);
        let name_length = cursor.read_u8()?;
        let attributes = cursor.read_u8()?;
        let mut name_field = [0u8; NAME_FIELD_LEN];
        cursor.read_exact(&mut name_field)?;
        let first_cluster = cursor.read_u32::<BigEndian>()?;
        let size = cursor.read_u32::<BigEndian>()?;
        let created_date = cursor.read_u16::<BigEndian>()?;
        let created_time = cursor.read_u16::<BigEndian>()?;
        let modified_date = cursor.read_u16::<BigEndian>()?;
        let modified_time = cursor.read_u16::<BigEndian>()?;
        // the access date/time dword is not kept

        let name = if name_length <= MAX_NAME_LEN {
            let live = &name_field[..usize::from(name_length)];
            EntryName::Live(String::from_utf8_lossy(live).into_owned())
        } else {
            // 0xE5 deleted, 0xFF free, anything else treated the same way
            let mut live = name_field.len();
            while live > 0 && name_field[live - 1] == 0xFF {
                live -= 1;
            }
            EntryName::Deleted(name_field[..live].to_vec())
        };

        Ok(Self {
            name,
            attributes,
            first_cluster,
            size,
            created: FatTimestamp::from_raw(created_date, created_time),
            modified: FatTimestamp::from_raw(modified_date, modified_time),
        })
    }

    /// The synthetic entry behind "/": a directory rooted at cluster 1.
    pub(crate) fn root() -> Self {
        Self {
            name: EntryName::Live("/".to_string()),
            attributes: DIRECTORY_ATTRIBUTE,
            first_cluster: 1,
            size: 0,
            created: FatTimestamp::from_raw(0, 0),
            modified: FatTimestamp::from_raw(0, 0),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & DIRECTORY_ATTRIBUTE != 0
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.name, EntryName::Deleted(_))
    }

    /// Size visible to reads; deleted entries read as empty.
    pub fn read_size(&self) -> u64 {
        if self.is_deleted() { 0 } else { u64::from(self.size) }
    }
}
