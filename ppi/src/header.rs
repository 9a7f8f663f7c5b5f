use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

// PPI Header Format, CACE Technologies, revision 1.0.1

/// version (1) + flags (1) + length (2) + link type (4)
pub const RECORD_HEADER_LENGTH: usize = 8;
/// type (2) + data length (2)
pub const FIELD_HEADER_LENGTH: usize = 4;

pub const PPI_VERSION: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub version: u8,
    pub flags: u8,
    /// Length of the header and every field that follows it, payload excluded.
    pub length: u16,
    /// Link type of the payload.
    pub link_type: u32,
}

impl RecordHeader {
    pub fn new(length: u16, link_type: u32) -> Self {
        Self {
            version: PPI_VERSION,
            flags: 0,
            length,
            link_type,
        }
    }

    pub fn write(&self, buffer: &mut [u8], offset: usize) -> usize {
        let end = offset + RECORD_HEADER_LENGTH;
        let out = &mut buffer[offset..end];
        out[0] = self.version;
        out[1] = self.flags;
        out[2..4].copy_from_slice(&self.length.to_le_bytes());
        out[4..8].copy_from_slice(&self.link_type.to_le_bytes());
        end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHeader {
    pub field_type: u16,
    /// Length of the field body, the field header itself excluded.
    pub data_length: u16,
}

impl FieldHeader {
    pub fn new(field_type: FieldType, data_length: u16) -> Self {
        Self {
            field_type: field_type.into(),
            data_length,
        }
    }

    pub fn write(&self, buffer: &mut [u8], offset: usize) -> usize {
        let end = offset + FIELD_HEADER_LENGTH;
        let out = &mut buffer[offset..end];
        out[0..2].copy_from_slice(&self.field_type.to_le_bytes());
        out[2..4].copy_from_slice(&self.data_length.to_le_bytes());
        end
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u16)]
pub enum FieldType {
    Dot11Common = 2,
    Dot11nMac = 3,
    Dot11nMacPhy = 4,
    SpectrumMap = 5,
    ProcessInfo = 6,
    CaptureInfo = 7,

    Gps = 30002,
    Vector = 30003,
    Sensor = 30004,
    Antenna = 30005,
}
