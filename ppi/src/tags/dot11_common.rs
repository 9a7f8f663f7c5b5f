use crate::header::{FIELD_HEADER_LENGTH, FieldHeader, FieldType};
use crate::metadata::{Carrier, ChecksumInfo, Dot11Info, Encoding, RadioInfo};
use crate::tags::put;
use serde::{Deserialize, Serialize};

// PPI 802.11-Common tag
// field header (4) + TSF timer (8) + flags (2) + rate (2) + frequency (2)
// + channel flags (2) + FHSS hopset (1) + FHSS pattern (1) + signal (1) + noise (1)
pub const LENGTH: usize = 24;

pub mod flags {
    pub const FCS: u16 = 0x0001;
    pub const INVALID_FCS: u16 = 0x0004;
    pub const PHY_ERROR: u16 = 0x0008;
}

pub mod channel_flags {
    pub const TURBO: u16 = 0x0010;
    pub const CCK: u16 = 0x0020;
    pub const OFDM: u16 = 0x0040;
    pub const SPECTRUM_2GHZ: u16 = 0x0080;
    pub const SPECTRUM_5GHZ: u16 = 0x0100;
    pub const DYNAMIC_CCK: u16 = 0x0400;
    pub const GFSK: u16 = 0x0800;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot11CommonTag {
    pub tsf_timer: u64,
    pub flags: u16,
    /// 500 kbit/s units
    pub rate: u16,
    pub frequency_mhz: u16,
    pub channel_flags: u16,
    pub fhss_hopset: u8,
    pub fhss_pattern: u8,
    pub signal_dbm: i8,
    pub noise_dbm: i8,
}

impl Dot11CommonTag {
    /// The tag only exists when radio information does.
    pub fn from_facets(
        radio: Option<&RadioInfo>, dot11: Option<&Dot11Info>, checksum: Option<&ChecksumInfo>,
    ) -> Option<Self> {
        let radio = radio?;

        let mut tag_flags = 0;
        if dot11.is_some_and(|info| info.corrupt) {
            tag_flags |= flags::PHY_ERROR;
        }
        if let Some(checksum) = checksum {
            tag_flags |= flags::FCS;
            if !checksum.valid {
                tag_flags |= flags::INVALID_FCS;
            }
        }

        Some(Self {
            tsf_timer: dot11.map(|info| info.timestamp).unwrap_or(0),
            flags: tag_flags,
            rate: radio.data_rate,
            frequency_mhz: radio.frequency_mhz as u16,
            channel_flags: channel_flags(radio.encoding, radio.carrier),
            // FHSS isn't tracked, the fields stay reserved
            fhss_hopset: 0,
            fhss_pattern: 0,
            signal_dbm: radio.signal_dbm,
            noise_dbm: radio.noise_dbm,
        })
    }

    pub fn size(&self) -> usize {
        LENGTH
    }

    /// Writes the tag at `offset` and returns the offset right after it.
    pub fn write(&self, buffer: &mut [u8], offset: usize) -> usize {
        let data_length = (LENGTH - FIELD_HEADER_LENGTH) as u16;

        let mut cursor =
            FieldHeader::new(FieldType::Dot11Common, data_length).write(buffer, offset);
        cursor = put(buffer, cursor, self.tsf_timer.to_le_bytes());
        cursor = put(buffer, cursor, self.flags.to_le_bytes());
        cursor = put(buffer, cursor, self.rate.to_le_bytes());
        cursor = put(buffer, cursor, self.frequency_mhz.to_le_bytes());
        cursor = put(buffer, cursor, self.channel_flags.to_le_bytes());
        cursor = put(
            buffer,
            cursor,
            [
                self.fhss_hopset,
                self.fhss_pattern,
                self.signal_dbm as u8,
                self.noise_dbm as u8,
            ],
        );

        debug_assert_eq!(cursor - offset, LENGTH);
        cursor
    }
}

/// Bytes the 802.11-common tag takes, 0 without radio information.
pub fn size(radio: Option<&RadioInfo>) -> usize {
    match radio {
        Some(_) => LENGTH,
        None => 0,
    }
}

pub fn channel_flags(encoding: Encoding, carrier: Carrier) -> u16 {
    encoding_flags(encoding) | carrier_flags(carrier)
}

fn encoding_flags(encoding: Encoding) -> u16 {
    match encoding {
        Encoding::Cck => channel_flags::CCK,
        Encoding::Ofdm => channel_flags::OFDM,
        Encoding::DynamicCck => channel_flags::DYNAMIC_CCK,
        Encoding::Gfsk => channel_flags::GFSK,
        Encoding::Pbcc | Encoding::Unknown => 0,
    }
}

fn carrier_flags(carrier: Carrier) -> u16 {
    use channel_flags::*;

    match carrier {
        Carrier::Dot11b => SPECTRUM_2GHZ | CCK,
        Carrier::Dot11bPlus => SPECTRUM_2GHZ | CCK | TURBO,
        Carrier::Dot11a => SPECTRUM_5GHZ | OFDM,
        // Could be OFDM or dynamic CCK, only the band is certain
        Carrier::Dot11g => SPECTRUM_2GHZ,
        Carrier::Dot11Fhss => SPECTRUM_2GHZ | GFSK,
        Carrier::Dot11Dsss => SPECTRUM_2GHZ,
        // The band isn't known for HT carriers
        Carrier::Dot11n20 | Carrier::Dot11n40 => OFDM,
        Carrier::Unknown => 0,
    }
}
