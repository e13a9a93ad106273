//! Logging to the console and the local syslog.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use syslog::{BasicLogger, Facility, Formatter3164};

use crate::config::TOOL_NAME;

/// Lowest level always sent to syslog, independent of the console level.
const SYSLOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Forwards records to the console logger and to syslog.
struct Logger {
    console: env_logger::Logger,
    syslog: Option<BasicLogger>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
            || (self.syslog.is_some() && metadata.level() <= SYSLOG_LEVEL)
    }

    fn log(&self, record: &Record) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if let Some(syslog) = &self.syslog {
            if record.level() <= SYSLOG_LEVEL {
                syslog.log(record);
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(syslog) = &self.syslog {
            syslog.flush();
        }
    }
}

/// Install the global logger.
///
/// The console shows records up to `level` (only errors if `quiet`), `RUST_LOG`
/// may refine it per target. Syslog receives everything from info upwards.
pub fn init(level: LevelFilter, quiet: bool) -> Result<(), SetLoggerError> {
    let console_level = if quiet { LevelFilter::Error } else { level };
    let console = env_logger::Builder::new()
        .filter_level(console_level)
        .parse_default_env()
        .build();

    let formatter = Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: TOOL_NAME.into(),
        pid: std::process::id(),
    };
    let (syslog, syslog_error) = match syslog::unix(formatter) {
        Ok(logger) => (Some(BasicLogger::new(logger)), None),
        Err(e) => (None, Some(e)),
    };

    let max_level = if syslog.is_some() {
        console.filter().max(SYSLOG_LEVEL)
    } else {
        console.filter()
    };

    log::set_boxed_logger(Box::new(Logger { console, syslog }))?;
    log::set_max_level(max_level);

    if let Some(e) = syslog_error {
        log::warn!(target: "logging", "Logging to syslog unavailable: {e}");
    }

    Ok(())
}
