//! Text utilities shared by the GRRM and xtb file readers.
//!
//! Both sides of the interface exchange strictly positional, line-oriented
//! text. [`LineCursor`] holds the lines of one file together with its name so
//! that every lookup ("line 3, field after the colon") can fail with a
//! [`ParseError`] that points at the exact line, instead of each reader
//! repeating its own index arithmetic and message formatting.
//!
//! Numeric values are deliberately kept as text: GRRM receives the digits
//! exactly as xtb printed them.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Error type for reading GRRM and xtb text files.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file does not exist
    #[error("{} not found.", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A line is missing or does not have the expected shape
    #[error("{file}, line {line}: {message}")]
    Malformed {
        /// Name of the file being parsed
        file: String,
        /// 1-based line number
        line: usize,
        /// What was expected
        message: String,
    },
    /// The GRRM task label is not one of the known labels
    #[error("{file} contains unexpected task type: {task}")]
    UnknownTask {
        /// Name of the file being parsed
        file: String,
        /// The label as found in the file
        task: String,
    },
}

/// Type alias for parse results
pub type Result<T> = std::result::Result<T, ParseError>;

/// Splits `s` on `delimiter`, dropping empty pieces.
///
/// `"a::b:"` split on `':'` gives `["a", "b"]`, which is how the GRRM header
/// lines (`TASK: ...`, `NACTIVEATOM / NATOM: 3 / 5`) are taken apart.
pub fn split_fields(s: &str, delimiter: char) -> Vec<&str> {
    s.split(delimiter).filter(|piece| !piece.is_empty()).collect()
}

/// Replaces every tab with a single space.
pub fn normalize_tabs(s: &str) -> String {
    s.replace('\t', " ")
}

/// Interprets a configuration flag: `true`, `1` and `on` (any case) are set.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "on"
    )
}

/// Line-addressed view of a text file that reports failures by line number.
#[derive(Debug, Clone)]
pub struct LineCursor {
    name: String,
    lines: Vec<String>,
}

impl LineCursor {
    /// Builds a cursor over in-memory content.
    ///
    /// `name` only appears in error messages.
    pub fn new(name: impl Into<String>, content: &str) -> Self {
        Self {
            name: name.into(),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Reads `path` into a cursor.
    ///
    /// A missing file is reported as [`ParseError::NotFound`] so callers can
    /// tell "xtb did not produce this" apart from other I/O failures.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ParseError::NotFound(path.to_path_buf())
            } else {
                ParseError::Io(e)
            }
        })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(name, &content))
    }

    /// Name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` for an empty file.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Builds a [`ParseError::Malformed`] for the 0-based line `index`.
    pub fn error(&self, index: usize, message: impl Into<String>) -> ParseError {
        ParseError::Malformed {
            file: self.name.clone(),
            line: index + 1,
            message: message.into(),
        }
    }

    /// Returns line `index` (0-based).
    pub fn line(&self, index: usize) -> Result<&str> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.error(index, "unexpected end of file"))
    }

    /// Returns `count` consecutive lines starting at `start`.
    pub fn lines(&self, start: usize, count: usize) -> Result<&[String]> {
        match start.checked_add(count) {
            Some(end) if end <= self.lines.len() => Ok(&self.lines[start..end]),
            _ => Err(self.error(
                self.lines.len(),
                format!(
                    "expected {} lines starting at line {}, file ends after line {}",
                    count,
                    start.saturating_add(1),
                    self.lines.len()
                ),
            )),
        }
    }

    /// Iterates over `(index, line)` pairs from `start` to the end of file.
    pub fn iter_from(&self, start: usize) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, line)| (i, line.as_str()))
    }

    /// Returns the second colon-separated field of line `index`, trimmed.
    pub fn field_after_colon(&self, index: usize) -> Result<&str> {
        let line = self.line(index)?;
        split_fields(line, ':')
            .get(1)
            .map(|field| field.trim())
            .ok_or_else(|| self.error(index, format!("expected 'LABEL: value', found '{}'", line)))
    }

    /// Fails unless line `index` starts with `tag` (e.g. `$energy`).
    pub fn expect_tag(&self, index: usize, tag: &str) -> Result<()> {
        match self.lines.get(index) {
            Some(line) if line.starts_with(tag) => Ok(()),
            _ => Err(self.error(
                index,
                format!("invalid {} file: missing {} at the beginning", self.name, tag),
            )),
        }
    }

    /// Parses `value`, which was taken from line `index`, as an integer.
    pub fn parse_int<T: FromStr>(&self, index: usize, value: &str, what: &str) -> Result<T> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(index, format!("invalid {}: '{}'", what, value.trim())))
    }
}
