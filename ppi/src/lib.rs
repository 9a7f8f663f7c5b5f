// Library lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

pub use crate::error::PpiError;
pub use crate::extension::{AuxContext, ExtensionRegistry, PpiExtension};
pub use crate::logfile::{Outcome, PpiLogfile};
pub use crate::metadata::{
    Carrier, ChecksumInfo, Dot11Info, Encoding, GpsFix, PacketEvent, RadioInfo,
    Timestamp,
};
pub use crate::record::{AssembledRecord, DropReason, PayloadFilter, RecordAssembler};
pub use crate::sink::{MemorySink, PcapSink, Sink, SinkError};

/// Link type of a file whose records carry a PPI header.
pub const DLT_PPI: i32 = 192;

/// Default link type of the frames wrapped inside PPI records.
pub const DLT_IEEE802_11: u32 = 105;

/// Hard maximum of a captured frame.
pub const MAX_PACKET_LEN: usize = 10240;

/// Snapshot length of written files. A longer record would be truncated by readers.
pub const SNAPLEN: usize = 65535;

pub mod error;
pub mod extension;
pub mod fixed;
pub mod header;
pub mod logfile;
pub mod metadata;
pub mod parser;
pub mod record;
pub mod sink;
pub mod tags;
