use std::io::{self, Write};

use log::{Metadata, Record};

/// Logger writing supervisor diagnostics to the diagnostic stream.
pub struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

pub fn init(debug: bool) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger))?;

    log::set_max_level(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    Ok(())
}
