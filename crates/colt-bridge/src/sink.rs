//! The IDE's diagnostics surface as seen by the bridge.
//!
//! Everything the bridge reports to a human goes through an [`OutputSink`]:
//! compiler diagnostics forwarded from the error log, and single-line faults
//! raised by the transport, bootstrapper and session.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

const SINK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sink");

/// Importance attached to a line written to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress notes such as "opened project".
    Info,
    /// A compiler diagnostic forwarded from the error log.
    Error,
    /// A failure raised by the bridge itself.
    Fault,
}

impl Severity {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Info | Self::Error => "",
            Self::Fault => "fault: ",
        }
    }
}

/// Receives diagnostics and faults on the event-loop thread.
pub trait OutputSink {
    /// Appends one line at the given severity.
    fn emit(&mut self, severity: Severity, line: &str);

    /// Removes every previously emitted diagnostic.
    fn clear(&mut self);

    /// Brings the diagnostics view to the foreground.
    fn reveal(&mut self) {}
}

/// Writes each line to an [`std::io::Write`] handle, prefixed by severity.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, severity: Severity, line: &str) {
        if let Err(error) = writeln!(self.writer, "{}{line}", severity.prefix()) {
            tracing::warn!(target: SINK_TARGET, %error, "failed to write diagnostic line");
        }
    }

    fn clear(&mut self) {
        tracing::debug!(target: SINK_TARGET, "diagnostics cleared");
    }
}

/// A line captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    /// Severity the line was emitted at.
    pub severity: Severity,
    /// Line text.
    pub line: String,
}

#[derive(Debug, Default)]
struct SinkRecord {
    entries: Vec<SinkEntry>,
    clears: usize,
    reveals: usize,
}

/// In-memory sink whose contents can be inspected from another handle.
///
/// Cloning yields a second handle onto the same record, so a caller can hand
/// one clone to the bridge and keep another for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    record: Arc<Mutex<SinkRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkRecord> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Lines currently held, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.lock().entries.clone()
    }

    /// Text of the lines currently held at `severity`.
    #[must_use]
    pub fn lines_at(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.severity == severity)
            .map(|entry| entry.line.clone())
            .collect()
    }

    /// Removes and returns the lines currently held.
    ///
    /// Clear and reveal counters are left untouched.
    #[must_use]
    pub fn drain(&self) -> Vec<SinkEntry> {
        std::mem::take(&mut self.lock().entries)
    }

    /// Number of times [`OutputSink::clear`] was called.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// Number of times [`OutputSink::reveal`] was called.
    #[must_use]
    pub fn reveal_count(&self) -> usize {
        self.lock().reveals
    }
}

impl OutputSink for MemorySink {
    fn emit(&mut self, severity: Severity, line: &str) {
        self.lock().entries.push(SinkEntry {
            severity,
            line: line.to_owned(),
        });
    }

    fn clear(&mut self) {
        let mut record = self.lock();
        record.entries.clear();
        record.clears += 1;
    }

    fn reveal(&mut self) {
        self.lock().reveals += 1;
    }
}
