/**
 * How long (milliseconds) a scan session runs before the controller stops it.
 */
pub const SCAN_DURATION: u64 = 10_000;

/**
 * Capacity of the channel carrying commands from the UI to the controller.
 */
pub const COMMAND_BUFFER: usize = 8;

/**
 * Shown instead of a device name when the advertisement carries none.
 */
pub const UNNAMED_DEVICE: &str = "Unnamed Device";

/**
 * Shortest scan (milliseconds) a config file may ask for.
 */
pub const MIN_SCAN_DURATION: u64 = 1_000;
