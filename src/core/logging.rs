//! Logging setup built on flexi_logger
//!
//! Hosts embedding the queue crate call [`init_logging`] once at startup.
//! Formats: plain text (default), colored text, or compact JSON for log
//! shippers. Only the log level can be changed after initialisation.

use std::sync::{Mutex, OnceLock};

static LOGGER_HANDLE: OnceLock<Mutex<flexi_logger::LoggerHandle>> = OnceLock::new();

/// Initialise the process-wide logger.
///
/// `level` is a flexi_logger spec string (`"info"`, `"sedaq=debug"`, ...).
/// `format` is `"text"` or `"json"`. When `file` is given, output goes to
/// that file instead of stderr.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
    file: Option<&str>,
    color_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use flexi_logger::{FileSpec, Logger};

    let mut logger = Logger::try_with_str(level.unwrap_or("info"))?;

    logger = match (format.unwrap_or("text"), color_enabled) {
        ("json", _) => logger.format(json_format),
        (_, true) => logger.format(color_format),
        _ => logger.format(text_format),
    };

    if let Some(path) = file {
        logger = logger.log_to_file(FileSpec::try_from(std::path::Path::new(path))?);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));
    Ok(())
}

/// Change the active log level at runtime. Format and output destination
/// are fixed at initialisation (flexi_logger limitation).
pub fn set_log_level(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let handle = LOGGER_HANDLE
        .get()
        .ok_or("logger not initialised, call init_logging first")?;
    let mut handle = handle
        .lock()
        .map_err(|_| "could not acquire logger handle lock")?;
    let _ = handle.parse_and_push_temp_spec(level);
    Ok(())
}

fn level_abbr(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

// "2026-01-02 15:04:05.123 INF message (queue/endpoint.rs:42)"
fn text_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args(),
        target_as_path(record.target(), record.line())
    )
}

fn color_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    let level = match record.level() {
        log::Level::Error => "ERR".red().bold(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Info => "INF".green(),
        log::Level::Debug => "DBG".blue(),
        log::Level::Trace => "TRC".magenta(),
    };
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        level,
        record.args(),
        target_as_path(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let entry = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_abbr(record.level()),
        "message": record.args().to_string(),
        "target": target_as_path(record.target(), record.line()),
    });
    match serde_json::to_string(&entry) {
        Ok(json) => w.write_all(json.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"failed to serialize log entry\"}"),
    }
}

// sedaq::queue::endpoint -> queue/endpoint.rs:42
fn target_as_path(target: &str, line: Option<u32>) -> String {
    let path = match target.strip_prefix("sedaq::") {
        Some(rest) => rest.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };
    match line {
        Some(n) => format!("{}:{}", path, n),
        None => path,
    }
}
