use crate::context::{Context, Source};
use crate::net::interface;
use crate::net::interface::InterfaceError;
use crossbeam::channel::{Receiver, Sender, bounded};
use ppi::{GpsFix, Outcome, PacketEvent, PpiError, PpiLogfile, Timestamp};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::thread::JoinHandle;
use thiserror::Error;

pub const READ_TIMEOUT_MS: i32 = 100;
const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub link_type: u32,
    pub frames: u64,
    pub records: u64,
    pub bytes: u64,
}

pub struct CaptureHandler {
    context: Context,

    shutdown_flag: Arc<AtomicBool>,
}

impl CaptureHandler {
    pub fn new(context: Context, shutdown_flag: Arc<AtomicBool>) -> Self {
        Self {
            context,
            shutdown_flag,
        }
    }

    pub fn start(&self) -> Result<Summary, CaptureError> {
        log::info!("Reading frames from '{}'.", self.context.source_name());

        match &self.context.source {
            Source::Device(device) => {
                let mut capture = interface::get_capture(device.clone(), READ_TIMEOUT_MS)
                    .map_err(CaptureError::InterfaceError)?;
                self.run(&mut capture)
            },
            Source::File(path) => {
                let mut capture =
                    pcap::Capture::from_file(path).map_err(CaptureError::PcapError)?;
                self.run(&mut capture)
            },
        }
    }

    fn run<T: pcap::Activated + ?Sized>(
        &self, capture: &mut pcap::Capture<T>,
    ) -> Result<Summary, CaptureError> {
        let config = &self.context.config;
        let link_type = config
            .link_type
            .unwrap_or(capture.get_datalink().0 as u32);

        let logfile = Arc::new(PpiLogfile::new(link_type));
        logfile
            .open_file(&config.output_file)
            .map_err(CaptureError::LogfileError)?;

        let (events_tx, events_rx) = bounded::<PacketEvent>(QUEUE_CAPACITY);
        let workers: Vec<JoinHandle<()>> = (0..config.workers)
            .map(|id| {
                let events_rx = events_rx.clone();
                let logfile = Arc::clone(&logfile);
                thread::spawn(move || work(id, events_rx, logfile))
            })
            .collect();
        drop(events_rx);

        let read_result = self.read_frames(capture, events_tx);

        for handle in workers {
            if handle.join().is_err() {
                log::error!("PPI worker thread panicked.");
            }
        }

        let summary = Summary {
            link_type,
            frames: read_result?,
            records: logfile.records(),
            bytes: logfile.bytes(),
        };
        logfile.close().map_err(CaptureError::LogfileError)?;

        Ok(summary)
    }

    /// Feeds frames to the workers until shutdown, end of input or a capture error.
    fn read_frames<T: pcap::Activated + ?Sized>(
        &self, capture: &mut pcap::Capture<T>, events_tx: Sender<PacketEvent>,
    ) -> Result<u64, CaptureError> {
        let mut frames = 0;
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                log::info!("Shutting down capture.");
                return Ok(frames);
            }

            match capture.next_packet() {
                Ok(packet) => {
                    let event = packet_event(
                        Timestamp::from(packet.header),
                        packet.data,
                        self.context.config.gps,
                    );
                    if events_tx.send(event).is_err() {
                        return Err(CaptureError::WorkersGone);
                    }
                    frames += 1;
                },
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => {
                    log::info!("End of input reached.");
                    return Ok(frames);
                },
                Err(err) => return Err(CaptureError::PcapError(err)),
            }
        }
    }
}

pub fn packet_event(timestamp: Timestamp, frame: &[u8], gps: Option<GpsFix>) -> PacketEvent {
    let mut event = PacketEvent::new(timestamp);
    event.link_frame = Some(frame.to_vec());
    event.gps = gps;
    event
}

fn work(id: usize, events: Receiver<PacketEvent>, logfile: Arc<PpiLogfile>) {
    for event in events.iter() {
        match logfile.handle(&event) {
            Ok(Outcome::Written { .. }) | Ok(Outcome::Paused) => {},
            Ok(Outcome::Dropped(reason)) => {
                log::debug!("Worker {id}: frame dropped. {reason}");
            },
            Ok(Outcome::Closed) => {
                log::warn!("Worker {id}: PPI log is closed, stopping.");
                return;
            },
            Err(err) => log_ppi_error(id, &err),
        }
    }
}

fn log_ppi_error(id: usize, err: &PpiError) {
    let mut message = format!("Worker {id}: {err}");
    if let Some(additional_info) = err.additional_info() {
        message.push_str(&format!(" Additional info: {additional_info}"));
    }
    log::error!("{}", message);
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Interface error.")]
    InterfaceError(InterfaceError),

    #[error("Pcap Library error.")]
    PcapError(pcap::Error),

    #[error("PPI log error.")]
    LogfileError(PpiError),

    #[error("All PPI workers stopped.")]
    WorkersGone,
}

impl CaptureError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            CaptureError::InterfaceError(err) => err.additional_info(),
            CaptureError::PcapError(err) => Some(err.to_string()),
            CaptureError::LogfileError(err) => err.additional_info(),
            CaptureError::WorkersGone => None,
        }
    }
}
