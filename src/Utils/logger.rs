//! Terminal logging of fit sessions.
use crate::error::{CurveFitError, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

/// Level filter from its name: "debug", "info", "warn", "error" or "off".
pub fn level_from_str(loglevel: &str) -> Result<LevelFilter> {
    match loglevel {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" => Ok(LevelFilter::Off),
        other => Err(CurveFitError::InvalidOption(format!(
            "loglevel must be debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// Installs a terminal logger at `loglevel`.
///
/// Returns `Ok(false)` when a logger is already installed (the first one stays active).
pub fn init_logger(loglevel: &str) -> Result<bool> {
    let level = level_from_str(loglevel)?;
    let logger_instance = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    Ok(logger_instance.is_ok())
}
