//! Error types for ledger operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or rewriting a ledger file.
///
/// Malformed lines are not errors; they are skipped during load.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading the ledger file failed.
    #[error("failed to read ledger {path}: {source}")]
    Read {
        /// Ledger file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Writing or replacing the ledger file failed.
    #[error("failed to write ledger {path}: {source}")]
    Write {
        /// Ledger file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
