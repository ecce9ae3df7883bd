//! The diagnostic channel.
//!
//! A single reporter serializes every line written to the diagnostic stream
//! and counts errors and warnings for exit-code computation. The sink is
//! injectable so tests can capture output instead of touching stderr.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Error;

/// Serialized sink for errors, warnings, and informational messages.
pub struct Reporter {
    sink: Mutex<Box<dyn Write + Send>>,
    errors: AtomicUsize,
    warnings: AtomicUsize,
    verbose: bool,
}

impl Reporter {
    /// A reporter writing to the process's stderr.
    pub fn stderr(verbose: bool) -> Arc<Self> {
        Self::with_sink(Box::new(std::io::stderr()), verbose)
    }

    /// A reporter writing to the given sink.
    pub fn with_sink(sink: Box<dyn Write + Send>, verbose: bool) -> Arc<Self> {
        Arc::new(Self {
            sink: Mutex::new(sink),
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
            verbose,
        })
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            // A broken diagnostic stream must not take the run down with it.
            let _ = writeln!(sink, "{line}");
            let _ = sink.flush();
        }
    }

    /// Report a failed operation: `Could not <operation> because <reason>`.
    pub fn could_not(&self, operation: impl fmt::Display, err: &Error) {
        debug_assert!(err.failed());
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.write_line(&format!("Could not {operation} because {}", err.message()));
    }

    /// Report an error line verbatim.
    pub fn error(&self, text: impl fmt::Display) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.write_line(&format!("error: {text}"));
    }

    /// Report a warning.
    pub fn warn(&self, text: impl fmt::Display) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
        self.write_line(&format!("warning: {text}"));
    }

    /// Report an informational message. Suppressed unless verbose.
    pub fn info(&self, text: impl fmt::Display) {
        if self.verbose {
            self.write_line(&format!("info: {text}"));
        }
    }

    /// How many errors were reported so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// How many warnings were reported so far.
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }
}

/// A sink capturing output in memory, for tests.
#[derive(Clone, Default)]
pub struct CaptureSink(Arc<Mutex<Vec<u8>>>);

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn could_not_formats_one_line() {
        let sink = CaptureSink::new();
        let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
        reporter.could_not("open \"x.adoc\"", &Error::new("permission denied"));
        assert_eq!(
            sink.contents(),
            "Could not open \"x.adoc\" because permission denied\n"
        );
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn info_is_gated_by_verbose() {
        let quiet = CaptureSink::new();
        let reporter = Reporter::with_sink(Box::new(quiet.clone()), false);
        reporter.info("skipped");
        assert_eq!(quiet.contents(), "");

        let loud = CaptureSink::new();
        let reporter = Reporter::with_sink(Box::new(loud.clone()), true);
        reporter.info("processed 3 files");
        assert_eq!(loud.contents(), "info: processed 3 files\n");
    }

    #[test]
    fn warnings_are_counted_separately() {
        let sink = CaptureSink::new();
        let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
        reporter.warn("conflicting declarations");
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.error_count(), 0);
        assert!(sink.contents().starts_with("warning: "));
    }
}
