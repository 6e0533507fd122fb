//! Log writer module
//!
//! Routes access and error lines to stdout/stderr or append-mode files.
//! Write failures are swallowed: logging never affects a response.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, console: Self) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Self::File(Mutex::new(open_log_file(path)?))),
            None => Ok(console),
        }
    }

    fn write_line(&self, message: &str) {
        let _ = match self {
            Self::Stdout => writeln!(io::stdout().lock(), "{message}"),
            Self::Stderr => writeln!(io::stderr().lock(), "{message}"),
            Self::File(file) => match file.lock() {
                Ok(mut f) => writeln!(f, "{message}"),
                Err(_) => Ok(()),
            },
        };
    }
}

pub struct LogWriter {
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access: LogTarget::open(access_log_file, LogTarget::Stdout)?,
            error: LogTarget::open(error_log_file, LogTarget::Stderr)?,
        })
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global log writer
///
/// Call once at startup; a second call fails with `AlreadyExists`.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Write an info/access line; stdout until `init` has run
pub fn write_access(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => writer.access.write_line(message),
        None => LogTarget::Stdout.write_line(message),
    }
}

/// Write an error line; stderr until `init` has run
pub fn write_error(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => writer.error.write_line(message),
        None => LogTarget::Stderr.write_line(message),
    }
}
