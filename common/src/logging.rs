use chrono::{Datelike, Local, Timelike};
use log::Record;
use std::fmt::Arguments;
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "[$Y-$m-$D $H:$M:$S $LEVEL] $MESSAGE";

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Logger initialization error.")]
    SetLoggerError(#[from] log::SetLoggerError),
}

impl LogError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            LogError::IOError(err) => Some(err.to_string()),
            LogError::SetLoggerError(err) => Some(err.to_string()),
        }
    }
}

/// `title_YYYY-MM-DD.log`, spaces in the title become dashes.
pub fn generate_file_name(title: &str) -> String {
    let now = Local::now();
    let title = title.trim().replace(' ', "-");

    format!(
        "{title}_{year:04}-{month:02}-{day:02}.log",
        year = now.year(),
        month = now.month(),
        day = now.day(),
    )
}

/// Expands `$Y $m $D $H $M $S` (local time), `$LEVEL`, `$TARGET` and `$MESSAGE`.
pub fn parse_format(format: &str, message: &Arguments, record: &Record) -> String {
    let format = format.trim();
    match format.split_once("$MESSAGE") {
        Some((head, tail)) => format!(
            "{}{}{}",
            expand(head, record),
            message,
            expand(tail, record)
        ),
        None => expand(format, record),
    }
}

fn expand(part: &str, record: &Record) -> String {
    let time = Local::now();
    let replacements = [
        ("$Y", format!("{:04}", time.year())),
        ("$m", format!("{:02}", time.month())),
        ("$D", format!("{:02}", time.day())),
        ("$H", format!("{:02}", time.hour())),
        ("$M", format!("{:02}", time.minute())),
        ("$S", format!("{:02}", time.second())),
        ("$LEVEL", record.level().to_string()),
        ("$TARGET", record.target().to_string()),
    ];

    let mut log = part.to_string();
    for (pattern, value) in replacements {
        log = log.replacen(pattern, &value, 1);
    }
    log
}
