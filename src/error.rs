//! Error types for the build pipeline and the store reader.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input yielded no records at all.
    #[error("no entries found in input")]
    EmptyInput,

    /// A line failed JSON parsing or lacks a required field.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Dictionary training failed or was given nothing to train on.
    #[error("dictionary training failed: {0}")]
    Training(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored blob could not be decompressed or decoded.
    #[error("failed to decode entry {entry_id}: {reason}")]
    Decompress { entry_id: i64, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}
