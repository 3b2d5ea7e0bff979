use clap::Parser;
use log::info;
use msgbox::IconType;
use ble_esp32::{init_logging, run};
use ble_esp32::cli::Args;
use ble_esp32::error::{error_msgbox, AppRunError, ConfigError};

// macOS refuses Bluetooth access to binaries without a usage description
#[cfg(target_os = "macos")]
embed_plist::embed_info_plist!("../../resources/Info.plist");

fn main() -> Result<(), AppRunError> {
    let args = Args::parse();
    init_logging(args.log_level);
    info!(concat!("BLE ESP32 ", env!("CARGO_PKG_VERSION")));

    match run(args) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            if let Err(err) = msgbox::create(
                concat!("BLE ESP32 ", env!("CARGO_PKG_VERSION")),
                "This application has already been started",
                IconType::Error,
            ) {
                eprintln!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
