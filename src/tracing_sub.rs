//! Global `tracing` subscriber for the demo and the bench.
//!
//! Formatted lines go into the process-wide [`DebugLogHandle`] when one has
//! been installed (the demo owns the terminal, so stderr is not an option),
//! and to stderr otherwise.
//!
//! [`DebugLogHandle`]: crate::debug_log::DebugLogHandle

use std::io::{self, Write};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::debug_log::{DebugLogWriter, global_debug_log};

/// Environment variable read by [`init_default`].
pub const LOG_LEVEL_ENV: &str = "DASH_GRID_LOG";

/// One formatted event's destination, picked when the event is written.
pub enum LogSink {
    Buffer(DebugLogWriter),
    Stderr(io::Stderr),
}

impl LogSink {
    fn current() -> Self {
        match global_debug_log() {
            Some(handle) => LogSink::Buffer(handle.writer()),
            None => LogSink::Stderr(io::stderr()),
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::Buffer(w) => w.write(buf),
            LogSink::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::Buffer(w) => w.flush(),
            LogSink::Stderr(s) => s.flush(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SinkMakeWriter;

impl<'a> MakeWriter<'a> for SinkMakeWriter {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        LogSink::current()
    }
}

/// Parse a level name such as `trace` or `WARN`. Blank or unknown values
/// give `None`.
pub fn parse_level(raw: &str) -> Option<Level> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Level::from_str(raw).ok()
}

/// Install the global subscriber at `level`. Later calls are no-ops.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(SinkMakeWriter)
        .with_target(false)
        .with_thread_names(false)
        .with_ansi(false)
        .try_init();
}

/// [`init`] at the level named by `DASH_GRID_LOG`, defaulting to debug.
pub fn init_default() {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(Level::DEBUG);
    init(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level(""), None);
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn sink_falls_back_to_stderr_without_a_buffer() {
        if global_debug_log().is_none() {
            assert!(matches!(SinkMakeWriter.make_writer(), LogSink::Stderr(_)));
        }
    }
}
