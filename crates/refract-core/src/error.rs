//! Composable error values for the documentation pipeline.
//!
//! Errors are values, not panics: every fallible stage returns an [`Error`]
//! (or a `Result` carrying one) and the caller decides whether to report,
//! collect, or escalate. Conversion into a thrown [`Exception`] happens only
//! when explicitly requested at the tool boundary.

use std::fmt;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Where an error was first reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl Origin {
    fn caller(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Holds the description of an error, or success.
///
/// A default-constructed value is success. The `reason` carries the message
/// with the reporting origin appended once, eagerly, at construction, so it
/// always shows where the failure was first seen. Equality and hashing use
/// the message alone, which is what higher layers deduplicate on.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Error {
    message: String,
    reason: String,
    origin: Option<Origin>,
}

impl Error {
    /// A value indicating success.
    pub fn success() -> Self {
        Self::default()
    }

    /// Construct a failure from a reason string.
    #[track_caller]
    pub fn new(reason: impl Into<String>) -> Self {
        let message = reason.into();
        debug_assert!(!message.is_empty());
        let origin = Origin::caller(Location::caller());
        let reason = format!("{message} (reported at {origin})");
        Self {
            message,
            reason,
            origin: Some(origin),
        }
    }

    /// Construct a failure from an OS-level error.
    #[track_caller]
    pub fn from_io(err: &std::io::Error) -> Self {
        Self::new(err.to_string())
    }

    /// Construct a failure from a batch of sub-errors.
    ///
    /// Successes in the batch are dropped. An empty batch, or one holding
    /// only successes, collapses to success. A batch with a single failure
    /// is that failure. Otherwise messages with equal text are deduplicated
    /// and the survivors are concatenated.
    #[track_caller]
    pub fn from_errors(errors: Vec<Error>) -> Self {
        let mut failed: Vec<Error> = Vec::new();
        for err in errors {
            if err.failed() && !failed.iter().any(|seen| *seen == err) {
                failed.push(err);
            }
        }
        match failed.len() {
            0 => Self::success(),
            1 => failed.pop().unwrap_or_default(),
            _ => {
                let message = failed
                    .iter()
                    .map(Error::message)
                    .collect::<Vec<_>>()
                    .join("; ");
                let origin = Origin::caller(Location::caller());
                let reason = failed
                    .iter()
                    .map(Error::reason)
                    .collect::<Vec<_>>()
                    .join("\n");
                Self {
                    message,
                    reason,
                    origin: Some(origin),
                }
            }
        }
    }

    /// Return true if this holds an error.
    pub fn failed(&self) -> bool {
        !self.message.is_empty()
    }

    /// The single-line error text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message with the reporting origin appended.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Where the error was first reported.
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    /// Escalate into an [`Exception`], or do nothing on success.
    pub fn throw_if_failed(self) -> Result<(), Exception> {
        if self.failed() {
            Err(Exception(self))
        } else {
            Ok(())
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for Error {}

impl std::hash::Hash for Error {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.message.hash(state);
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The one error type crossing the crate boundary.
///
/// Produced only by [`Error::throw_if_failed`]; everything below the tool
/// boundary passes [`Error`] values around instead.
#[derive(Debug, ThisError)]
#[error("{}", .0.reason())]
pub struct Exception(Error);

impl Exception {
    /// The error wrapped by this exception.
    pub fn error(&self) -> &Error {
        &self.0
    }
}

impl From<Error> for Exception {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
