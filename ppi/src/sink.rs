use crate::metadata::Timestamp;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Destination of assembled records.
pub trait Sink: Send {
    /// Appends one record. Captured and original length are both `data.len()`.
    fn append(&mut self, timestamp: Timestamp, data: &[u8]) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError>;
}

/// Synthesized record header. Nothing is ever truncated, so `caplen == len`.
pub fn frame_header(
    timestamp: Timestamp, length: usize,
) -> Result<pcap::PacketHeader, SinkError> {
    let length = u32::try_from(length).map_err(|_| SinkError::RecordTooLong(length))?;

    Ok(pcap::PacketHeader {
        ts: libc::timeval {
            tv_sec: timestamp.tv_sec as libc::time_t,
            tv_usec: timestamp.tv_usec as libc::suseconds_t,
        },
        caplen: length,
        len: length,
    })
}

/// pcap savefile with the PPI link type. Dead captures declare a snapshot length of
/// `SNAPLEN`, which the assembler keeps every record within.
pub struct PcapSink {
    file: pcap::Savefile,
}

impl PcapSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = pcap::Capture::dead(pcap::Linktype(crate::DLT_PPI))
            .map_err(SinkError::PcapError)?
            .savefile(path)
            .map_err(SinkError::PcapError)?;

        Ok(Self { file })
    }
}

impl Sink for PcapSink {
    fn append(&mut self, timestamp: Timestamp, data: &[u8]) -> Result<(), SinkError> {
        let header = frame_header(timestamp, data.len())?;
        self.file.write(&pcap::Packet::new(&header, data));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.file.flush().map_err(SinkError::PcapError)
    }
}

/// Keeps records in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<(Timestamp, Vec<u8>)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Timestamp, Vec<u8>)> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => vec![],
        }
    }
}

impl Sink for MemorySink {
    fn append(&mut self, timestamp: Timestamp, data: &[u8]) -> Result<(), SinkError> {
        let mut records = self.records.lock().map_err(|_| SinkError::Poisoned)?;
        records.push((timestamp, data.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Pcap Library error.")]
    PcapError(pcap::Error),

    #[error("Record is too long for a pcap header.")]
    RecordTooLong(usize),

    #[error("Sink storage lock is poisoned.")]
    Poisoned,
}

impl SinkError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            SinkError::PcapError(err) => Some(err.to_string()),
            SinkError::RecordTooLong(length) => Some(format!("Length: {length}")),
            _ => None,
        }
    }
}
