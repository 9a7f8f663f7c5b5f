use std::path::Path;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub valid: u64,
    pub malformed: u64,
}

/// Decodes every record of a written PPI file.
pub fn verify(path: &Path) -> Result<Report, VerifyError> {
    let mut capture = pcap::Capture::from_file(path).map_err(VerifyError::PcapError)?;

    let link_type = capture.get_datalink();
    if link_type != pcap::Linktype(ppi::DLT_PPI) {
        return Err(VerifyError::NotPpi(link_type.0));
    }

    let mut report = Report::default();
    loop {
        let packet = match capture.next_packet() {
            Ok(packet) => packet,
            Err(pcap::Error::NoMorePackets) => return Ok(report),
            Err(err) => return Err(VerifyError::PcapError(err)),
        };

        match ppi::parser::parse_record(packet.data) {
            Ok(_) => report.valid += 1,
            Err(err) => {
                let index = report.valid + report.malformed;
                log::warn!("Record {index} is malformed: {err}");
                report.malformed += 1;
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Pcap Library error.")]
    PcapError(pcap::Error),

    #[error("File link type {0} is not PPI.")]
    NotPpi(i32),
}

impl VerifyError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            VerifyError::PcapError(err) => Some(err.to_string()),
            VerifyError::NotPpi(_) => None,
        }
    }
}
