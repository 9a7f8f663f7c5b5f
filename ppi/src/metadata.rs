use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Capture time of a frame, as carried by a pcap record header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl Timestamp {
    pub fn new(tv_sec: i64, tv_usec: i64) -> Self {
        Self { tv_sec, tv_usec }
    }
}

impl From<&pcap::PacketHeader> for Timestamp {
    fn from(header: &pcap::PacketHeader) -> Self {
        Self {
            tv_sec: header.ts.tv_sec as i64,
            tv_usec: header.ts.tv_usec as i64,
        }
    }
}

/// Everything the pipeline knows about one frame.
/// Every facet is optional, a missing facet simply means nothing is logged for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketEvent {
    pub timestamp: Timestamp,

    /// Frame exactly as captured from the link.
    pub link_frame: Option<Vec<u8>>,
    /// Frame with the lower-layer wrapping stripped.
    pub decapsulated: Option<Vec<u8>>,
    /// Frame rewritten by the pipeline, f.ex. after decryption.
    pub mangled: Option<Vec<u8>>,

    pub dot11: Option<Dot11Info>,
    pub radio: Option<RadioInfo>,
    pub gps: Option<GpsFix>,
    pub checksum: Option<ChecksumInfo>,
}

impl PacketEvent {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot11Info {
    /// TSF timer of the receiving radio.
    pub timestamp: u64,
    pub corrupt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadioInfo {
    /// Data rate in units of 500 kbit/s.
    pub data_rate: u16,
    /// Center frequency in MHz.
    pub frequency_mhz: f64,
    pub signal_dbm: i8,
    pub noise_dbm: i8,
    pub encoding: Encoding,
    pub carrier: Carrier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum Encoding {
    Unknown,
    Cck,
    Pbcc,
    Ofdm,
    DynamicCck,
    Gfsk,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum Carrier {
    Unknown,
    Dot11b,
    Dot11bPlus,
    Dot11a,
    Dot11g,
    Dot11Fhss,
    Dot11Dsss,
    Dot11n20,
    Dot11n40,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// 0 - no fix, 1 - no usable fix, 2 - 2D, 3 - 3D.
    pub fix: u8,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub altitude: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumInfo {
    pub valid: bool,
    /// Trailing FCS bytes of the frame, as captured.
    pub fcs: [u8; 4],
}
