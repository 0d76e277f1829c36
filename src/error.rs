//! Error types for the scan and rewrite engine.
//!
//! Errors are split by the boundary they are caught at: [`RegionError`] is
//! caught per region (the rest of the document is still scanned),
//! [`RewriteError`] per finding or per document, and [`FileError`] per file.
//! None of them aborts a run.

use std::path::PathBuf;

use thiserror::Error;

/// A region whose extent cannot be determined from indentation alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    /// The keyword line or its body indents with both tabs and spaces.
    #[error("ambiguous indentation in `{keyword}` region at line {line}: mixed tabs and spaces")]
    Ambiguous { keyword: String, line: usize },
}

/// A finding that could not be turned into new text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// No generic fix exists; the finding needs a human.
    #[error("{target}: {reason}")]
    UnsupportedShapeFix {
        target: &'static str,
        reason: &'static str,
    },

    /// The text under the finding's span is not what the classifier saw.
    #[error("stale finding at {start}..{end}: expected {expected:?}")]
    StaleFinding {
        start: usize,
        end: usize,
        expected: String,
    },

    /// The fix loop kept finding work after its pass budget ran out.
    #[error("no convergence after {passes} rewrite passes")]
    NoProgress { passes: usize },
}

/// Per-file I/O failures.
#[derive(Debug, Error)]
pub enum FileError {
    /// Permission, I/O, or encoding failure while reading.
    #[error("unreadable file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The backup could not be written or verified. The original is untouched.
    #[error("backup failed for {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backup exists but replacing the original failed.
    #[error("write failed for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
