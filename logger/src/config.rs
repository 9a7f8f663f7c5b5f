use common::logging;
use log::LevelFilter;
use ppi::GpsFix;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_OUTPUT_FILE: &str = "ppilog.pcap";
const DEFAULT_WORKERS: usize = 1;

pub struct Config {
    pub log_format: String,
    pub log_level: LevelFilter,
    pub log_to_file: bool,

    pub interface: Option<String>,
    pub input_file: Option<PathBuf>,
    pub output_file: PathBuf,
    /// Link type written into the records. Taken from the capture when absent.
    pub link_type: Option<u32>,
    pub workers: usize,
    pub verify_output: bool,

    /// Static position attached to every frame.
    pub gps: Option<GpsFix>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: logging::DEFAULT_FORMAT.to_string(),
            log_level: LevelFilter::Info,
            log_to_file: false,

            interface: None,
            input_file: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            link_type: None,
            workers: DEFAULT_WORKERS,
            verify_output: false,

            gps: None,
        }
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Config", 10)?;
        state.serialize_field("log_format", &self.log_format)?;
        state.serialize_field("log_level", &self.log_level.to_string())?;
        state.serialize_field("log_to_file", &self.log_to_file)?;
        state.serialize_field("interface", &self.interface)?;
        state.serialize_field("input_file", &self.input_file)?;
        state.serialize_field("output_file", &self.output_file)?;
        state.serialize_field("link_type", &self.link_type)?;
        state.serialize_field("workers", &self.workers)?;
        state.serialize_field("verify_output", &self.verify_output)?;
        state.serialize_field("gps", &self.gps)?;
        state.end()
    }
}

impl Config {
    pub fn from_file() -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(CONFIG_FILENAME) {
            Ok(value) => value,
            Err(_) => {
                let config = Config::default();
                config.save_to_file()?;
                return Ok(config);
            },
        };

        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let dto: ConfigDto =
            toml::from_str(data).map_err(ConfigError::TomlDeserializationError)?;
        dto.into_config()
    }

    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let data = toml::to_string(&self).map_err(ConfigError::TomlSerializationError)?;
        std::fs::write(CONFIG_FILENAME, data).map_err(ConfigError::IOError)?;

        Ok(())
    }
}

#[derive(Deserialize)]
struct ConfigDto {
    log_format: String,
    log_level: String,
    log_to_file: bool,

    #[serde(default)]
    interface: Option<String>,
    #[serde(default)]
    input_file: Option<PathBuf>,
    output_file: PathBuf,
    #[serde(default)]
    link_type: Option<u32>,
    workers: usize,
    #[serde(default)]
    verify_output: bool,

    #[serde(default)]
    gps: Option<GpsFix>,
}

impl ConfigDto {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let interface = self.interface.filter(|name| !name.trim().is_empty());
        if interface.is_some() && self.input_file.is_some() {
            return Err(ConfigError::AmbiguousSource);
        }

        if self.output_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputFile);
        }

        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        if let Some(fix) = &self.gps {
            if !(-90.0..=90.0).contains(&fix.latitude)
                || !(-180.0..=180.0).contains(&fix.longitude)
            {
                return Err(ConfigError::InvalidGpsPosition);
            }
        }

        let config = Config {
            log_format: self.log_format,
            log_level: LevelFilter::from_str(self.log_level.trim())
                .map_err(|_| ConfigError::UnknownLogLevel)?,
            log_to_file: self.log_to_file,

            interface,
            input_file: self.input_file,
            output_file: self.output_file,
            link_type: self.link_type,
            workers: self.workers,
            verify_output: self.verify_output,

            gps: self.gps,
        };

        Ok(config)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("TOML Serialization Error.")]
    TomlSerializationError(#[from] toml::ser::Error),

    #[error("TOML Deserialization Error.")]
    TomlDeserializationError(#[from] toml::de::Error),

    #[error("Unknown log level.")]
    UnknownLogLevel,

    #[error("Both an interface and an input file are set.")]
    AmbiguousSource,

    #[error("Output file is empty.")]
    EmptyOutputFile,

    #[error("At least one worker is needed.")]
    NoWorkers,

    #[error("GPS position is out of range.")]
    InvalidGpsPosition,
}

impl ConfigError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ConfigError::IOError(err) => Some(err.to_string()),
            ConfigError::TomlSerializationError(err) => Some(err.to_string()),
            ConfigError::TomlDeserializationError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}
