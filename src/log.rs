//! Scraper logging
//!
//! Each run truncates `<config dir>/nexus/scraper.log` and sends `tracing`
//! output there. `RUST_LOG` controls the filter.

use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "nexus=info";

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Initialize the log file and install the subscriber
pub fn init_log() -> Option<PathBuf> {
    init_log_in(&dirs::config_dir()?.join("nexus"))
}

/// Like [`init_log`], with the log file placed in `dir`
pub fn init_log_in(dir: &Path) -> Option<PathBuf> {
    std::fs::create_dir_all(dir).ok()?;
    let log_path = dir.join("scraper.log");

    // Truncate log file on startup
    let mut file = File::create(&log_path).ok()?;
    let _ = writeln!(
        file,
        "=== Scraper Log Started {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(log_path.clone());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
    {
        eprintln!("scraper log not attached: {}", e);
    }

    Some(log_path)
}

/// Get the log file path
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|g| g.clone())
}

/// Read recent log entries (last N lines)
pub fn read_recent_logs(n: usize) -> Vec<String> {
    let path = match get_log_path().or_else(default_log_path) {
        Some(p) => p,
        None => return vec!["Log not initialized".to_string()],
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => last_lines(&content, n),
        Err(_) => vec!["Could not read log file".to_string()],
    }
}

/// Where [`init_log`] writes, whether or not it ran in this process
fn default_log_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("nexus").join("scraper.log"))
}

fn last_lines(content: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    lines[lines.len().saturating_sub(n)..]
        .iter()
        .map(|l| l.to_string())
        .collect()
}
