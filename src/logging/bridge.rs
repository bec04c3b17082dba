//! `log` facade bridge.
//!
//! Third-party crates log through the `log` macros; installing the bridge
//! routes those records into a [`Logger`] so the whole process shares one
//! sink.

use log::LevelFilter;

use super::level::Level;
use super::logger::Logger;
use crate::fields;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

struct Bridge {
    logger: Logger,
}

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        Level::from(metadata.level()) <= self.logger.level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger.log(
            record.level().into(),
            &record.args().to_string(),
            &fields! { "module" => record.target() },
        );
    }

    fn flush(&self) {}
}

/// Install `logger` as the process-wide backend for the `log` facade.
///
/// Fails if another facade backend was installed first, per
/// `log::set_boxed_logger`.
pub fn install(logger: Logger) -> Result<(), log::SetLoggerError> {
    let filter = match logger.level() {
        Level::Crit | Level::Fatal | Level::Error => LevelFilter::Error,
        Level::Warn => LevelFilter::Warn,
        Level::Info => LevelFilter::Info,
        Level::Debug => LevelFilter::Debug,
        Level::Trace => LevelFilter::Trace,
    };
    log::set_boxed_logger(Box::new(Bridge { logger }))?;
    log::set_max_level(filter);
    Ok(())
}
