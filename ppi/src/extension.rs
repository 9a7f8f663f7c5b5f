use crate::error::PpiError;
use crate::metadata::PacketEvent;
use std::any::Any;
use std::sync::{Arc, RwLock};

/// Opaque value handed back to an extension on every call.
pub type AuxContext = dyn Any + Send + Sync;

/// Encoder of a tag the core knows nothing about.
///
/// Every record is built in two passes. First `query_size` is asked how many bytes the
/// extension needs for this event (0 is fine), then, once the buffer exists, `write`
/// receives the buffer and the offset its bytes start at and returns the offset right
/// after them.
///
/// The buffer handed to `write` ends where the extension's own region ends. Bytes
/// before `offset` are still reachable, and an extension that writes something other
/// than what it declared corrupts its region of the record. That is on the extension.
pub trait PpiExtension: Send + Sync {
    fn query_size(&self, event: &PacketEvent, context: Option<&AuxContext>) -> usize;

    fn write(
        &self, event: &PacketEvent, buffer: &mut [u8], offset: usize,
        context: Option<&AuxContext>,
    ) -> usize;
}

#[derive(Clone)]
pub struct ExtensionEntry {
    pub encoder: Arc<dyn PpiExtension>,
    pub context: Option<Arc<AuxContext>>,
}

impl ExtensionEntry {
    pub fn query_size(&self, event: &PacketEvent) -> usize {
        self.encoder.query_size(event, self.context.as_deref())
    }

    pub fn write(&self, event: &PacketEvent, buffer: &mut [u8], offset: usize) -> usize {
        self.encoder
            .write(event, buffer, offset, self.context.as_deref())
    }

    /// Same encoder and same context, by reference.
    fn is(&self, encoder: &Arc<dyn PpiExtension>, context: &Option<Arc<AuxContext>>) -> bool {
        let same_context = match (&self.context, context) {
            (None, None) => true,
            (Some(left), Some(right)) => {
                std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
            },
            _ => false,
        };

        same_context && std::ptr::addr_eq(Arc::as_ptr(&self.encoder), Arc::as_ptr(encoder))
    }
}

/// Ordered set of extensions. Read on every record, changed rarely.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: RwLock<Vec<ExtensionEntry>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same (encoder, context) pair again changes nothing.
    pub fn register(
        &self, encoder: Arc<dyn PpiExtension>, context: Option<Arc<AuxContext>>,
    ) -> Result<(), PpiError> {
        let mut entries = self.entries.write().map_err(|_| PpiError::RegistryPoisoned)?;

        if entries.iter().any(|entry| entry.is(&encoder, &context)) {
            log::debug!("PPI extension is already registered.");
            return Ok(());
        }

        entries.push(ExtensionEntry { encoder, context });
        log::debug!("PPI extension registered. Total: {}", entries.len());
        Ok(())
    }

    /// Unknown pairs are ignored.
    pub fn unregister(
        &self, encoder: &Arc<dyn PpiExtension>, context: &Option<Arc<AuxContext>>,
    ) -> Result<(), PpiError> {
        let mut entries = self.entries.write().map_err(|_| PpiError::RegistryPoisoned)?;

        if let Some(index) = entries.iter().position(|entry| entry.is(encoder, context)) {
            entries.remove(index);
            log::debug!("PPI extension removed. Total: {}", entries.len());
        }

        Ok(())
    }

    /// Copy of the current entries. A record is built from one snapshot so both of
    /// its passes see the same extensions in the same order.
    pub fn snapshot(&self) -> Result<Vec<ExtensionEntry>, PpiError> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .map_err(|_| PpiError::RegistryPoisoned)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
