use std::cell::RefCell;
use std::sync::Once;
use log::{Level, LevelFilter, Log, Metadata, Record};

// Each test runs on its own thread, and a current-thread tokio runtime polls spawned tasks on
// that same thread, so records are kept per thread.
thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| records.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Installs the capturing logger and forgets anything this thread logged so far.
pub fn capture() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("Failed to install capturing logger");
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

pub fn warnings() -> Vec<String> {
    RECORDS.with(|records| {
        records.borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
