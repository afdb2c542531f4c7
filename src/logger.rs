//! Per-run log of session transitions (load, commit, undo/redo, reset,
//! export, batch results).
//!
//! The editor and the headless batch each keep one file under the data
//! directory, truncated when the run opens it:
//!   `<data dir>/PixelStretch/pixelstretch.log`        (editor)
//!   `<data dir>/PixelStretch/pixelstretch-batch.log`  (`-i/--input` runs)
//!
//! Modules log through `log_info!` / `log_warn!` / `log_err!`. Until
//! [`open`] has run (unit tests, library use) those are no-ops.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static SINK: OnceLock<Mutex<LogSink<File>>> = OnceLock::new();

/// Which front end the process is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Session {
    Editor,
    Batch,
}

impl Session {
    fn file_name(self) -> &'static str {
        match self {
            Session::Editor => "pixelstretch.log",
            Session::Batch => "pixelstretch-batch.log",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Session::Editor => "editor",
            Session::Batch => "batch",
        }
    }
}

/// `[HH:MM:SS] [LEVEL] message` lines, flushed per entry so a crash keeps
/// everything written before it.
pub struct LogSink<W: Write> {
    out: W,
}

impl<W: Write> LogSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn entry(&mut self, secs: u64, level: &str, msg: &str) -> io::Result<()> {
        writeln!(self.out, "[{}] [{}] {}", format_clock(secs), level, msg)?;
        self.out.flush()
    }
}

/// Append one entry to the open log. I/O errors are ignored.
pub fn write(level: &str, msg: &str) {
    let Some(sink) = SINK.get() else { return };
    if let Ok(mut sink) = sink.lock() {
        let _ = sink.entry(now_secs(), level, msg);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Open the log for this run and route panics into it. Returns the file
/// path, or `None` (with a warning on stderr) when it cannot be created;
/// the run continues unlogged in that case.
pub fn open(session: Session) -> Option<PathBuf> {
    let path = log_file_path(session);
    match open_at(&path, session) {
        Ok(()) => Some(path),
        Err(e) => {
            eprintln!("warning: no session log at {}: {}", path.display(), e);
            None
        }
    }
}

fn open_at(path: &Path, session: Session) -> io::Result<()> {
    if SINK.get().is_some() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    if SINK.set(Mutex::new(LogSink::new(file))).is_err() {
        return Ok(());
    }
    log_info!("{} session, PixelStretch {}", session.label(), env!("CARGO_PKG_VERSION"));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write("PANIC", &info.to_string());
        prev(info);
    }));
    Ok(())
}

fn log_file_path(session: Session) -> PathBuf {
    data_dir().join("PixelStretch").join(session.file_name())
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

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// HH:MM:SS within the UTC day.
fn format_clock(secs: u64) -> String {
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
