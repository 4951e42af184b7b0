//! Structured console logger.
//!
//! Adapted from the teacher's tag-based logger: a small set of domain tags,
//! colorized level prefixes, and a free `log(tag, level, message)` call
//! convention used throughout the crate instead of bare `println!`.
//! Unlike the teacher, there is no file rotation/retention here — this
//! service runs as a container workload and logs to stdout only.

use chrono::Utc;
use colored::*;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which subsystem emitted the log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Api,
    Worker,
    Engine,
    Cache,
    System,
}

impl LogTag {
    fn label(self) -> &'static str {
        match self {
            LogTag::Api => "API",
            LogTag::Worker => "WORKER",
            LogTag::Engine => "ENGINE",
            LogTag::Cache => "CACHE",
            LogTag::System => "SYSTEM",
        }
    }
}

static DEBUG_ENABLED: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(false));

/// Enable `DEBUG`-level log lines; set once at process start from `--debug`.
pub fn set_debug_enabled(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

fn colorize_level(level: &str, text: String) -> ColoredString {
    match level {
        "ERROR" => text.red().bold(),
        "WARN" => text.yellow(),
        "SUCCESS" => text.green(),
        "DEBUG" => text.dimmed(),
        _ => text.normal(),
    }
}

/// Emit one structured log line: `[TIMESTAMP] [TAG] [LEVEL] message`.
///
/// `DEBUG`-level lines are suppressed unless `set_debug_enabled(true)` was
/// called, so hot paths (e.g. per-strategy-leaf evaluation) can log freely.
pub fn log(tag: LogTag, level: &str, message: &str) {
    if level == "DEBUG" && !is_debug_enabled() {
        return;
    }

    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let line = format!("[{}] [{:<6}] [{:<7}] {}", timestamp, tag.label(), level, message);
    println!("{}", colorize_level(level, line));
}
