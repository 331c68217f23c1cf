use std::path::PathBuf;

use thiserror::Error;

use super::annotations::AnnotationId;

/// Errors reported by session operations.
///
/// Every error is local to the single failed operation: the session's
/// in-memory state is unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Negative onset/duration, empty label, interval past the end of the
    /// buffer, or an interval rejected by the nesting policy.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Channel name not present in the buffer's channel list.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// Delete/edit referenced a nonexistent annotation id.
    #[error("no annotation with id {0}")]
    NotFound(AnnotationId),

    /// Save target exists and the overwrite flag was not set.
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// Malformed persisted file (wrong column count, non-numeric fields).
    #[error("parse error at line {line}: {msg}")]
    ParseError { line: usize, msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub(crate) fn parse(line: usize, msg: impl Into<String>) -> Self {
        SessionError::ParseError {
            line,
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
