//! Logging setup for the backtesting platform.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::setting::SETTINGS;
use super::utility::get_folder_path;

/// Log level constants (compatible with the original platform's levels)
pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;
pub const CRITICAL: i32 = 50;

/// Convert integer log level to tracing Level
pub fn level_from_int(level: i32) -> Level {
    match level {
        0..=10 => Level::DEBUG,
        11..=20 => Level::INFO,
        21..=30 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Initialize the tracing subscriber from global settings.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_logger() {
    if !SETTINGS.get_bool("log.active").unwrap_or(true) {
        return;
    }

    let log_level = SETTINGS.get_int("log.level").unwrap_or(INFO as i64) as i32;
    let log_console = SETTINGS.get_bool("log.console").unwrap_or(true);
    let log_file = SETTINGS.get_bool("log.file").unwrap_or(false);

    let level = level_from_int(log_level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let registry = tracing_subscriber::registry().with(filter);

    let file = if log_file {
        let log_path = get_log_file_path();
        if let Some(parent) = log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(&log_path).ok()
    } else {
        None
    };

    let result = match (log_console, file) {
        (true, Some(file)) => registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .with(fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false))
            .try_init(),
        (true, None) => registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init(),
        (false, Some(file)) => registry
            .with(fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false))
            .try_init(),
        (false, None) => return,
    };

    if let Err(err) = result {
        tracing::debug!("logger already initialized: {}", err);
    }
}

fn get_log_file_path() -> PathBuf {
    let log_folder = get_folder_path("log");
    let today = Local::now().format("%Y%m%d").to_string();
    log_folder.join(format!("bt_{}.log", today))
}

/// Named logger facade over tracing.
pub struct Logger {
    pub name: String,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(logger = %self.name, "{}", msg);
    }

    pub fn info(&self, msg: &str) {
        tracing::info!(logger = %self.name, "{}", msg);
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!(logger = %self.name, "{}", msg);
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(logger = %self.name, "{}", msg);
    }

    /// Log a message with an integer level
    pub fn log(&self, level: i32, msg: &str) {
        match level {
            0..=10 => self.debug(msg),
            11..=20 => self.info(msg),
            21..=30 => self.warn(msg),
            _ => self.error(msg),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("Logger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_int() {
        assert_eq!(level_from_int(DEBUG), Level::DEBUG);
        assert_eq!(level_from_int(INFO), Level::INFO);
        assert_eq!(level_from_int(WARNING), Level::WARN);
        assert_eq!(level_from_int(ERROR), Level::ERROR);
    }

    #[test]
    fn test_logger_name() {
        let logger = Logger::new("Backtest");
        assert_eq!(logger.name, "Backtest");
        logger.log(INFO, "message routed by level");
    }
}
