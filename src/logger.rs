//! Session logger — writes log output to a single per-session file.
//!
//! The host application decides where the log lives by calling [`init_at`]
//! (or [`init`] for the platform data directory). Until one of them runs,
//! the `log_info!` / `log_warn!` / `log_err!` macros are no-ops, so library
//! users who don't care about logging pay nothing.
//!
//! The file is truncated at each init, so it only ever contains output from
//! the most-recent session. I/O errors while logging are swallowed —
//! logging must never take the editor down.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path of the current session log, if logging is initialised.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a raw line to the session log. Silently ignores I/O errors and
/// does nothing when the logger is uninitialised.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get() {
        if let Ok(mut file) = mutex.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Write a timestamped, level-tagged line to the session log.
pub fn write(level: &str, msg: &str) {
    write_line(&format!("[{}] [{}] {}", timestamp(), level, msg));
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        $crate::logger::write("INFO", &format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        $crate::logger::write("WARN", &format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {{
        $crate::logger::write("ERROR", &format!($($arg)*));
    }};
}

/// Initialise the logger at the default platform location
/// (`<data dir>/rasterstudio/session.log`).
pub fn init() {
    init_at(&data_dir().join("rasterstudio").join("session.log"));
}

/// Initialise the logger at an explicit path, truncating any previous
/// session's content. Calling more than once keeps the first target.
pub fn init_at(path: &Path) {
    if LOG_FILE.get().is_some() {
        return;
    }

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.to_path_buf());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!(
        "=== rasterstudio session started (unix {}) ===",
        unix_secs()
    ));
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// HH:MM:SS within the current day — enough for a session log.
fn timestamp() -> String {
    let secs = unix_secs();
    format!(
        "{:02}:{:02}:{:02}",
        (secs % 86400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
