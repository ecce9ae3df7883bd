//! Refract Core - engine for the Refract reference-documentation generator
//!
//! This crate provides the pipeline:
//! - Frontend: declaration records per translation unit
//! - Extract: partial symbols with attached doc comments
//! - Corpus: the merged, finalized symbol index
//! - Generate: AsciiDoc, XML, and bitcode artifact production

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Composable error values and the tool-boundary exception
pub mod error;

/// The serialized diagnostic channel
pub mod report;

/// Dynamic tagged values for template engines
pub mod dom;

/// The symbol model: ids, kinds, types, doc blocks
pub mod symbol;

/// The corpus index and the cross-TU merger
pub mod corpus;

/// Per-translation-unit extraction and the compilation database
pub mod extract;

/// The parsing front-end contract and the built-in header scanner
pub mod frontend;

/// Tool configuration
pub mod config;

/// The fixed-size worker pool and task groups
pub mod taskgroup;

/// Documentation generators and the multi-file writer
pub mod generate;

/// Convenience re-export of the error value
pub use error::Error;

/// Convenience re-export of the reporter
pub use report::Reporter;

/// Convenience re-export of the corpus
pub use corpus::Corpus;

/// Convenience re-export of the configuration
pub use config::Config;

/// Convenience re-export of the worker pool
pub use taskgroup::{TaskGroup, ThreadPool};
