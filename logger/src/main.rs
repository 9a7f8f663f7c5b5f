use crate::capture::CaptureHandler;
use crate::config::Config;
use crate::context::Context;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    let config = Config::from_file().unwrap_or_else(|err| {
        exit_with("Config initialization failed", &err, err.additional_info());
    });

    logging::setup(&config).unwrap_or_else(|err| {
        exit_with("Logger initialization failed", &err, err.additional_info());
    });

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown_flag);
    if let Err(err) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Release);
    }) {
        log::error!("Failed to set Ctrl-C handler: {}", err);
        std::process::exit(1);
    }

    let verify_output = config.verify_output;
    let output_file = config.output_file.clone();

    let context = Context::new(config).unwrap_or_else(|err| {
        log::error!("{}", message("Context initialization failed", &err, err.additional_info()));
        std::process::exit(1);
    });

    let summary = CaptureHandler::new(context, shutdown_flag)
        .start()
        .unwrap_or_else(|err| {
            log::error!("{}", message("Capture failed", &err, err.additional_info()));
            std::process::exit(1);
        });

    log::info!(
        "Frames read: {}. Records written: {}. Bytes written: {}. Link type: {}.",
        summary.frames,
        summary.records,
        summary.bytes,
        summary.link_type
    );

    if verify_output {
        match verify::verify(&output_file) {
            Ok(report) => log::info!(
                "Verified '{}'. Valid records: {}. Malformed records: {}.",
                output_file.display(),
                report.valid,
                report.malformed
            ),
            Err(err) => {
                log::error!("{}", message("Verification failed", &err, err.additional_info()));
                std::process::exit(1);
            },
        }
    }
}

fn message(context: &str, err: &dyn std::error::Error, additional_info: Option<String>) -> String {
    let mut message = format!("{context}. Error: {err}.");
    if let Some(additional_info) = additional_info {
        message.push_str(&format!(" Additional info: {additional_info}"));
    }
    message
}

/// Used before the logger is up.
fn exit_with(context: &str, err: &dyn std::error::Error, additional_info: Option<String>) -> ! {
    println!("{}", message(context, err, additional_info));
    std::process::exit(1);
}

mod capture;
mod config;
mod context;
mod logging;
mod net;
mod verify;
