use crate::sink::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PpiError {
    #[error("Sink error.")]
    Sink(#[from] SinkError),

    #[error("Sink is not available.")]
    SinkUnavailable(SinkError),

    #[error("Extension registry lock is poisoned.")]
    RegistryPoisoned,

    #[error("Payload filter lock is poisoned.")]
    FilterPoisoned,

    #[error("Sink lock is poisoned.")]
    SinkPoisoned,
}

impl PpiError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            PpiError::Sink(err) | PpiError::SinkUnavailable(err) => err.additional_info(),
            _ => None,
        }
    }
}
