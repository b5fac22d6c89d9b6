//! Error types for loading, denesting and persisting a story document
//!
//! Three kinds of failure are kept apart:
//! - I/O on the document location (read or write)
//! - a document that is not valid JSON
//! - a document whose records don't have the shape the migration needs
//!
//! None of them is recovered; the first one aborts the run.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Malformed,
    Structural,
}

/// Points at a single record inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    /// `stories[i]`
    Story(usize),
    /// `stories[i].chapters[j]`
    EmbeddedChapter { story: usize, chapter: usize },
    /// `chapters[i]`
    Chapter(usize),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Story(index) => write!(f, "stories[{}]", index),
            RecordRef::EmbeddedChapter { story, chapter } => {
                write!(f, "stories[{}].chapters[{}]", story, chapter)
            }
            RecordRef::Chapter(index) => write!(f, "chapters[{}]", index),
        }
    }
}

/// The document parsed, but its records can't be migrated.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    /// Top-level layout is wrong (not an object, `stories` not a list, ...)
    #[error("document layout is invalid: {0}")]
    Layout(#[source] serde_json::Error),

    /// A record lacks a field the migration reads
    #[error("{record} is missing required field '{field}'")]
    MissingField {
        record: RecordRef,
        field: &'static str,
    },

    /// A record is not a mapping, or one of its fields has the wrong type
    #[error("{record} has an invalid shape: {source}")]
    InvalidRecord {
        record: RecordRef,
        #[source]
        source: serde_json::Error,
    },

    /// Two sort-key values that have no defined ordering
    #[error("cannot order {field} value {left} against {right}")]
    Unorderable {
        field: &'static str,
        left: Value,
        right: Value,
    },
}

impl StructuralError {
    pub fn missing(record: RecordRef, field: &'static str) -> Self {
        Self::MissingField { record, field }
    }
}

/// Crate-level error returned by every stage of a migration run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read { .. } | Error::Write { .. } => ErrorKind::Io,
            Error::Malformed { .. } => ErrorKind::Malformed,
            Error::Structural(_) => ErrorKind::Structural,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
