//! Process-wide logging setup plus conditional logging macros that check a
//! module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```rust,ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("This will log if ENABLE_LOGS is true");
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{mpsc::Sender, Arc, Mutex},
};

use anyhow::{Context, Result};
use log::LevelFilter;

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
///
/// Each module that uses this macro must define:
/// ```rust,ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Where formatted log lines go besides stderr.
#[derive(Default)]
pub struct LogSinks<'a> {
    /// Append-only log file, created when missing.
    pub file: Option<&'a Path>,
    /// Receives every formatted line, used by the desktop shell to show the log.
    pub forward: Option<Sender<String>>,
}

/// Keeps the file sink reachable so it can be flushed on exit.
pub struct LogGuard {
    file: Arc<Mutex<Option<File>>>,
}

impl LogGuard {
    pub fn flush(&self) {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            let _ = file.flush();
        }
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        self.flush();
    }
}

struct FanoutWriter {
    file: Arc<Mutex<Option<File>>>,
    forward: Option<Sender<String>>,
}

impl Write for FanoutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;

        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.write_all(buf)?;
            }
        }

        if let Some(tx) = &self.forward {
            let line = String::from_utf8_lossy(buf).trim_end().to_string();
            if !line.is_empty() {
                // The receiver goes away when the window closes.
                let _ = tx.send(line);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// Attaches the sinks and installs the global logger. Reads `RUST_LOG`, defaulting to `info`.
///
/// Only the first call installs the logger; later calls still return a guard but log a warning.
pub fn init_logging(sinks: LogSinks<'_>) -> Result<LogGuard> {
    let file = match sinks.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?,
        ),
        None => None,
    };
    let file = Arc::new(Mutex::new(file));

    let writer = FanoutWriter {
        file: Arc::clone(&file),
        forward: sinks.forward,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(writer)));

    if builder.try_init().is_err() {
        log::warn!("logger already initialised; keeping the existing sinks");
    }

    Ok(LogGuard { file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_reach_the_configured_log_file() {
        let path = std::env::temp_dir().join(format!("powertag-log-{}.log", uuid::Uuid::new_v4()));
        let (tx, rx) = std::sync::mpsc::channel();

        let guard = init_logging(LogSinks {
            file: Some(&path),
            forward: Some(tx),
        })
        .unwrap();
        log::warn!("radio ID 1A2B not found in roster");
        guard.flush();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("WARN - radio ID 1A2B not found in roster"));
        assert!(rx.try_iter().any(|line| line.ends_with("radio ID 1A2B not found in roster")));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn fanout_forwards_trimmed_lines() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut writer = FanoutWriter {
            file: Arc::new(Mutex::new(None)),
            forward: Some(tx),
        };

        writer.write_all(b"slot 3 configured\n").unwrap();
        writer.write_all(b"\n").unwrap();

        assert_eq!(rx.try_recv().unwrap(), "slot 3 configured");
        assert!(rx.try_recv().is_err());
    }
}
