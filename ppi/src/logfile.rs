use crate::error::PpiError;
use crate::extension::{AuxContext, ExtensionRegistry, PpiExtension};
use crate::metadata::PacketEvent;
use crate::record::{DropReason, PayloadFilter, RecordAssembler};
use crate::sink::{PcapSink, Sink};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// What happened to one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Written { bytes: usize },
    Paused,
    Closed,
    Dropped(DropReason),
}

/// PPI pcap log. Safe to share between the threads that deliver events.
pub struct PpiLogfile {
    assembler: RecordAssembler,
    extensions: ExtensionRegistry,
    filter: RwLock<Option<Arc<dyn PayloadFilter>>>,

    paused: AtomicBool,
    sink: Mutex<Option<Box<dyn Sink>>>,

    records: AtomicU64,
    bytes: AtomicU64,
}

impl PpiLogfile {
    /// `link_type` is the link type of the frames that end up inside the records.
    pub fn new(link_type: u32) -> Self {
        Self {
            assembler: RecordAssembler::new(link_type),
            extensions: ExtensionRegistry::new(),
            filter: RwLock::new(None),
            paused: AtomicBool::new(false),
            sink: Mutex::new(None),
            records: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Installs `sink`, replacing any previous one. The new sink is in place even when
    /// flushing the previous one fails, that error is still returned.
    pub fn open(&self, sink: Box<dyn Sink>) -> Result<(), PpiError> {
        let mut guard = self.sink.lock().map_err(|_| PpiError::SinkPoisoned)?;
        let previous = guard.replace(sink);
        self.records.store(0, Ordering::Release);
        self.bytes.store(0, Ordering::Release);
        drop(guard);

        match previous {
            Some(mut previous) => previous.flush().map_err(PpiError::Sink),
            None => Ok(()),
        }
    }

    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PpiError> {
        let path = path.as_ref();
        let sink = PcapSink::create(path).map_err(PpiError::SinkUnavailable)?;
        self.open(Box::new(sink))?;

        log::info!("Opened PPI pcap log file '{}'", path.display());
        Ok(())
    }

    /// Stops accepting events, flushes and releases the sink.
    pub fn close(&self) -> Result<(), PpiError> {
        let sink = self.sink.lock().map_err(|_| PpiError::SinkPoisoned)?.take();

        match sink {
            Some(mut sink) => {
                sink.flush()?;
                log::info!(
                    "Closed PPI log. Records: {}, bytes: {}",
                    self.records(),
                    self.bytes()
                );
                Ok(())
            },
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().map(|sink| sink.is_some()).unwrap_or(false)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn register_extension(
        &self, encoder: Arc<dyn PpiExtension>, context: Option<Arc<AuxContext>>,
    ) -> Result<(), PpiError> {
        self.extensions.register(encoder, context)
    }

    pub fn unregister_extension(
        &self, encoder: &Arc<dyn PpiExtension>, context: &Option<Arc<AuxContext>>,
    ) -> Result<(), PpiError> {
        self.extensions.unregister(encoder, context)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn set_filter(&self, filter: Option<Arc<dyn PayloadFilter>>) -> Result<(), PpiError> {
        let mut guard = self.filter.write().map_err(|_| PpiError::FilterPoisoned)?;
        *guard = filter;
        Ok(())
    }

    /// Records written since the last open.
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Acquire)
    }

    /// Bytes written since the last open.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Builds the record of one event and appends it.
    ///
    /// Events that produce no record are reported through `Outcome` and never stop
    /// the following ones. An error means the sink itself failed.
    pub fn handle(&self, event: &PacketEvent) -> Result<Outcome, PpiError> {
        if self.is_paused() {
            return Ok(Outcome::Paused);
        }

        // Building and appending under one lock keeps records whole and in order.
        let mut guard = self.sink.lock().map_err(|_| PpiError::SinkPoisoned)?;
        let sink = match guard.as_mut() {
            Some(sink) => sink,
            None => return Ok(Outcome::Closed),
        };

        let extensions = self.extensions.snapshot()?;
        let filter = self
            .filter
            .read()
            .map_err(|_| PpiError::FilterPoisoned)?
            .clone();

        let record = match self.assembler.assemble(event, &extensions, filter.as_deref()) {
            Ok(record) => record,
            Err(reason) => {
                match reason {
                    DropReason::Oversize { .. }
                    | DropReason::TagsTooLong(_)
                    | DropReason::RecordTooLong { .. } => {
                        log::error!("Weird frame in PPI logger. {}", reason);
                    },
                    DropReason::NoPayload | DropReason::Empty => {
                        log::trace!("{}", reason);
                    },
                }
                return Ok(Outcome::Dropped(reason));
            },
        };

        sink.append(record.timestamp, &record.data)?;

        self.records.fetch_add(1, Ordering::AcqRel);
        self.bytes.fetch_add(record.len() as u64, Ordering::AcqRel);

        Ok(Outcome::Written {
            bytes: record.len(),
        })
    }
}

impl Drop for PpiLogfile {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::error!("Failed to close PPI log. {}", err);
        }
    }
}
