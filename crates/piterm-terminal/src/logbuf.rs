//! In-process log collection.
//!
//! Everything the workspace logs through the `log` facade lands in a
//! shared buffer that the renderer paints as the log tail. A logger
//! writing to stderr would tear the full-screen repaint, so nothing
//! ever goes to the real terminal directly.

use std::sync::{Arc, Mutex, PoisonError};

use log::{Level, LevelFilter, Log, Metadata, Record};

use piterm_types::{PitermError, Result};

/// Cap on retained log lines.
const MAX_LINES: usize = 1000;

/// Shared, cloneable handle to the collected log lines.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, dropping the oldest once the cap is reached.
    pub fn push(&self, line: String) {
        let mut lines = self.lock();
        lines.push(line);
        if lines.len() > MAX_LINES {
            lines.remove(0);
        }
    }

    /// Snapshot of all lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all lines.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `log::Log` implementation feeding a [`LogBuffer`].
struct BufferLogger {
    buffer: LogBuffer,
}

impl Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.buffer.push(format_record(record));
    }

    fn flush(&self) {}
}

/// Info lines render bare; other levels carry a prefix.
fn format_record(record: &Record<'_>) -> String {
    match record.level() {
        Level::Info => format!("{}", record.args()),
        level => format!("{}: {}", level.as_str().to_ascii_lowercase(), record.args()),
    }
}

/// Install the buffer logger as the global logger.
///
/// `debug` controls whether debug-level lines are collected; the level
/// can be raised later with [`set_debug`].
pub fn install_logger(buffer: LogBuffer, debug: bool) -> Result<()> {
    log::set_boxed_logger(Box::new(BufferLogger { buffer }))
        .map_err(|e| PitermError::Config(format!("logger already installed: {e}")))?;
    set_debug(debug);
    Ok(())
}

/// Switch debug-level collection on or off.
pub fn set_debug(debug: bool) {
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}
