use std::env;
use log::LevelFilter;
use crate::cli::Args;
use crate::config::io::ConfigIO;
use crate::error::AppRunError;
use crate::gui::application::run_application;

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod gui;
pub mod permission;

#[cfg(test)]
mod test_log;

pub fn init_logging(level: LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub fn run(args: Args) -> Result<(), AppRunError> {
    let mut config_io = ConfigIO::new_sync(args.config)?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    run_application(config_io, args.scan_duration)?;
    Ok(())
}
