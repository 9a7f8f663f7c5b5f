use crate::config::Config;
use crate::net::interface;
use crate::net::interface::InterfaceError;
use std::path::PathBuf;
use thiserror::Error;

/// Where frames are read from.
pub enum Source {
    Device(pcap::Device),
    File(PathBuf),
}

pub struct Context {
    pub config: Config,
    pub source: Source,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, ContextError> {
        let source = match (&config.interface, &config.input_file) {
            (_, Some(path)) => Source::File(path.clone()),
            (Some(name), None) => Source::Device(
                interface::find_by_name(name).map_err(ContextError::InterfaceError)?,
            ),
            (None, None) => {
                let device =
                    interface::first_usable().map_err(ContextError::InterfaceError)?;
                log::info!(
                    "No source configured, capturing on '{}'.",
                    interface::display_name(&device)
                );
                Source::Device(device)
            },
        };

        Ok(Self { config, source })
    }

    pub fn source_name(&self) -> String {
        match &self.source {
            Source::Device(device) => interface::display_name(device),
            Source::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Interface error.")]
    InterfaceError(InterfaceError),
}

impl ContextError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ContextError::InterfaceError(err) => err.additional_info().or(Some(err.to_string())),
        }
    }
}
