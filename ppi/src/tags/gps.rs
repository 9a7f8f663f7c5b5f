use crate::fixed;
use crate::header::{FIELD_HEADER_LENGTH, FieldHeader, FieldType};
use crate::metadata::GpsFix;
use crate::tags::put;
use serde::{Deserialize, Serialize};

// PPI-GEOLOCATION GPS tag
// field header (4) + version (1) + magic (1) + length (2) + fields present (4)
pub const HEADER_LENGTH: usize = 12;
pub const FIELD_LENGTH: usize = 4;

pub const VERSION: u8 = 2;
pub const MAGIC: u8 = 0xCF;
/// Application marker stored after the coordinates, "KIS\0" read little-endian.
pub const APP_ID: u32 = 0x0053_494B;

/// Fields present bits
pub mod flags {
    pub const LATITUDE: u32 = 1 << 1;
    pub const LONGITUDE: u32 = 1 << 2;
    pub const ALTITUDE: u32 = 1 << 3;
    pub const APP_ID: u32 = 1 << 29;
}

pub const FIX_2D: u8 = 2;
pub const FIX_3D: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsTag {
    pub latitude: u32,
    pub longitude: u32,
    pub altitude: Option<u32>,
}

impl GpsTag {
    /// Fixes below 2D carry nothing worth logging.
    pub fn from_fix(fix: &GpsFix) -> Option<Self> {
        if fix.fix < FIX_2D {
            return None;
        }

        let altitude = match fix.fix >= FIX_3D {
            true => Some(fixed::to_fixed6_4(fix.altitude)),
            false => None,
        };

        Some(Self {
            latitude: fixed::to_fixed3_7(fix.latitude),
            longitude: fixed::to_fixed3_7(fix.longitude),
            altitude,
        })
    }

    pub fn size(&self) -> usize {
        // Latitude, longitude, application id
        let mut size = HEADER_LENGTH + 3 * FIELD_LENGTH;
        if self.altitude.is_some() {
            size += FIELD_LENGTH;
        }
        size
    }

    pub fn fields_present(&self) -> u32 {
        let mut present = flags::LATITUDE | flags::LONGITUDE | flags::APP_ID;
        if self.altitude.is_some() {
            present |= flags::ALTITUDE;
        }
        present
    }

    /// Writes the tag at `offset` and returns the offset right after it.
    pub fn write(&self, buffer: &mut [u8], offset: usize) -> usize {
        let data_length = (self.size() - FIELD_HEADER_LENGTH) as u16;

        let mut cursor = FieldHeader::new(FieldType::Gps, data_length).write(buffer, offset);
        cursor = put(buffer, cursor, [VERSION, MAGIC]);
        cursor = put(buffer, cursor, data_length.to_le_bytes());
        cursor = put(buffer, cursor, self.fields_present().to_le_bytes());

        cursor = put(buffer, cursor, self.latitude.to_le_bytes());
        cursor = put(buffer, cursor, self.longitude.to_le_bytes());
        if let Some(altitude) = self.altitude {
            cursor = put(buffer, cursor, altitude.to_le_bytes());
        }
        cursor = put(buffer, cursor, APP_ID.to_le_bytes());

        debug_assert_eq!(cursor - offset, self.size());
        cursor
    }
}

/// Bytes the GPS tag takes for this fix, 0 when it is omitted.
pub fn size(fix: Option<&GpsFix>) -> usize {
    fix.and_then(GpsTag::from_fix)
        .map(|tag| tag.size())
        .unwrap_or(0)
}
