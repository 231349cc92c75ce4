//! Drive-level metadata recovered from the security sector.
//!
//! Stock Xbox 360 drives carry a security sector at absolute offset 0x2000
//! holding the serial number, firmware revision, model number and sector
//! count, followed by the MS-logo PNG at 0x2204. The PNG signature doubles
//! as the sentinel deciding whether the metadata is present at all; raw
//! partition images do not have it.

use crate::device::{SECTOR_SIZE, SectorSource};
use crate::error::Result;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

const SECURITY_SECTOR_OFFSET: u64 = 0x2000;
const LOGO_OFFSET: u64 = 0x2204;
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

// serial[20] firmware[8] model[40] pad[20] sector_count[4], little-endian
const METADATA_LEN: usize = 0x5C;
const SECTOR_COUNT_OFFSET: u64 = 0x58;

/// Identity block of a physical drive.
#[derive(Debug, Clone)]
pub struct DriveInfo {
    pub serial_number: String,
    pub firmware_revision: String,
    pub model_number: String,
    pub sector_count: u32,
}

impl DriveInfo {
    /// Probes `source` for the security sector.
    ///
    /// Returns `None` when the source is too small or the PNG sentinel is
    /// absent; I/O failures on a detected sector propagate.
    pub fn probe<S: SectorSource>(source: &S) -> Result<Option<Self>> {
        if source.size() < LOGO_OFFSET + PNG_SIGNATURE.len() as u64 {
            return Ok(None);
        }
        let signature = source.read_at(LOGO_OFFSET, PNG_SIGNATURE.len())?;
        if signature != PNG_SIGNATURE {
            return Ok(None);
        }

        let data = source.read_at(SECURITY_SECTOR_OFFSET, METADATA_LEN)?;
        let mut cursor = Cursor::new(&data);
        cursor.set_position(SECTOR_COUNT_OFFSET);
        let sector_count = cursor.read_u32::<LittleEndian>()?;

        let info = Self {
            serial_number: ascii_field(&data[0x00..0x14]),
            firmware_revision: ascii_field(&data[0x14..0x1C]),
            model_number: ascii_field(&data[0x1C..0x44]),
            sector_count,
        };
        log::info!(
            "drive {} (firmware {}, serial {}), {} sectors",
            info.model_number,
            info.firmware_revision,
            info.serial_number,
            info.sector_count
        );
        Ok(Some(info))
    }

    /// Drive capacity in bytes.
    pub fn capacity(&self) -> u64 {
        u64::from(self.sector_count) * SECTOR_SIZE
    }
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
