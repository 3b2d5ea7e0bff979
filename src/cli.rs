use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Scans for nearby Bluetooth Low Energy devices and lists them.", long_about = None)]
pub struct Args {
    /// Use this config file instead of the portable or per-user one
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minimum level of log messages: off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,

    /// How long a scan runs, overriding the config file. Example: "15s"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub scan_duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["ble-esp32"]).unwrap();
        assert_eq!(args.config, None);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert_eq!(args.scan_duration, None);
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "ble-esp32",
            "--config", "/tmp/scanner.json",
            "--log-level", "debug",
            "--scan-duration", "15s",
        ]).unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/scanner.json")));
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert_eq!(args.scan_duration, Some(Duration::from_secs(15)));
    }

    #[test]
    fn rejects_malformed_duration() {
        assert!(Args::try_parse_from(["ble-esp32", "--scan-duration", "soon"]).is_err());
    }
}
