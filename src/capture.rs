//! Collects log records per thread so tests running in parallel only see their own.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

static INIT: Once = Once::new();
static LOGGER: Capture = Capture;

struct Capture;

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

/// Installs the capturing logger once and forgets this thread's records.
pub fn start() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

pub fn take() -> Vec<(Level, String)> {
    RECORDS.with(|records| records.borrow_mut().drain(..).collect())
}

pub fn contains(level: Level, needle: &str) -> bool {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .any(|(lvl, msg)| *lvl == level && msg.contains(needle))
    })
}
