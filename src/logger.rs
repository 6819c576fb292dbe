//! Console logging for xcpbot
//!
//! Tagged, timestamped, colored output. Level filtering is controlled by the
//! `XCPBOT_LOG` environment variable (error, warn, info, debug).

use chrono::Utc;
use colored::*;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

const LEVEL_ERROR: u8 = 0;
const LEVEL_WARN: u8 = 1;
const LEVEL_INFO: u8 = 2;
const LEVEL_DEBUG: u8 = 3;

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LEVEL_INFO);

/// Log category tags, one per subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Monitor,
    Store,
    Ledger,
    Notify,
    Dispenser,
}

impl LogTag {
    fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Monitor => "MONITOR",
            LogTag::Store => "STORE",
            LogTag::Ledger => "LEDGER",
            LogTag::Notify => "NOTIFY",
            LogTag::Dispenser => "DISPENSER",
        }
    }
}

/// Initialize the logger, reading the level filter from the environment
pub fn init() {
    let level = match std::env::var("XCPBOT_LOG").as_deref() {
        Ok("error") => LEVEL_ERROR,
        Ok("warn") => LEVEL_WARN,
        Ok("debug") => LEVEL_DEBUG,
        _ => LEVEL_INFO,
    };
    MAX_LEVEL.store(level, Ordering::Relaxed);
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn emit(symbol: ColoredString, tag: LogTag, message: &str) {
    println!(
        "{} {} {} {}",
        symbol,
        format!("[{}]", timestamp()).dimmed(),
        format!("[{}]", tag.as_str()).bold(),
        message
    );
    let _ = io::stdout().flush();
}

pub fn info(tag: LogTag, message: &str) {
    if MAX_LEVEL.load(Ordering::Relaxed) >= LEVEL_INFO {
        emit("ℹ".blue().bold(), tag, message);
    }
}

pub fn warn(tag: LogTag, message: &str) {
    if MAX_LEVEL.load(Ordering::Relaxed) >= LEVEL_WARN {
        emit("⚠".yellow().bold(), tag, message);
    }
}

pub fn error(tag: LogTag, message: &str) {
    if MAX_LEVEL.load(Ordering::Relaxed) >= LEVEL_ERROR {
        emit("❌".red().bold(), tag, message);
    }
}

pub fn debug(tag: LogTag, message: &str) {
    if MAX_LEVEL.load(Ordering::Relaxed) >= LEVEL_DEBUG {
        emit("🐛".purple().bold(), tag, message);
    }
}

pub fn success(tag: LogTag, message: &str) {
    if MAX_LEVEL.load(Ordering::Relaxed) >= LEVEL_INFO {
        emit("✅".green().bold(), tag, message);
    }
}
