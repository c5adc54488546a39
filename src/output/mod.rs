//! Output module
//!
//! Streams extracted records to a local file.
//!
//! # Formats
//!
//! - **JSON**: one pretty-printed array, the format of a classic Jira export
//! - **JSON Lines**: one compact record per line
//!
//! Records are written as they arrive, so memory use does not grow with the
//! size of the export.

mod writer;

pub use writer::{OutputFormat, RecordWriter};
