//! Streaming record writer

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File layout of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// One JSON object per line
    Jsonl,
}

impl OutputFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "ndjson") => Self::Jsonl,
            _ => Self::Json,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Jsonl => f.write_str("jsonl"),
        }
    }
}

/// Writes records one at a time
///
/// The output is only complete once [`RecordWriter::finish`] has run; a JSON
/// array left unfinished has no closing bracket.
pub struct RecordWriter<W: Write = BufWriter<File>> {
    out: W,
    format: OutputFormat,
    path: Option<PathBuf>,
    count: u64,
    finished: bool,
}

impl RecordWriter {
    /// Create (or truncate) `path` and write to it
    pub fn create(path: impl AsRef<Path>, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;

        let mut writer = Self::new(BufWriter::new(file), format);
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> RecordWriter<W> {
    /// Write to any sink
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            path: None,
            count: 0,
            finished: false,
        }
    }

    /// Append one record
    pub fn write<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<()> {
        if self.finished {
            return Err(Error::Other("record writer already finished".to_string()));
        }
        match self.format {
            OutputFormat::Json => {
                let pretty = serde_json::to_string_pretty(record)?;
                let lead = if self.count == 0 { "[\n  " } else { ",\n  " };
                self.out.write_all(lead.as_bytes())?;
                self.out.write_all(pretty.replace('\n', "\n  ").as_bytes())?;
            }
            OutputFormat::Jsonl => {
                serde_json::to_writer(&mut self.out, record)?;
                self.out.write_all(b"\n")?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Close the array (JSON) and flush; returns the number of records written
    ///
    /// Calling it again is a no-op.
    pub fn finish(&mut self) -> Result<u64> {
        if !self.finished {
            if self.format == OutputFormat::Json {
                let tail: &[u8] = if self.count == 0 { b"[]\n" } else { b"\n]\n" };
                self.out.write_all(tail)?;
            }
            self.out.flush()?;
            self.finished = true;
        }
        Ok(self.count)
    }

    /// Records written so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Destination file, when writing to one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Give back the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> fmt::Debug for RecordWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordWriter")
            .field("format", &self.format)
            .field("path", &self.path)
            .field("count", &self.count)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
