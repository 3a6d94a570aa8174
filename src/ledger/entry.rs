//! Ledger entry and status definitions.

use std::fmt;

/// Prefix used when rendering [`Status::Error`].
const ERROR_PREFIX: &str = "Error: ";

/// Ledger column separator; never allowed inside an error message.
pub(crate) const FIELD_SEPARATOR: &str = " - ";

/// Replaces [`FIELD_SEPARATOR`] inside error messages.
const SEPARATOR_REPLACEMENT: &str = "; ";

/// Download lifecycle state of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Known but not yet downloaded.
    InQueue,
    /// A task is transferring the bytes.
    Downloading,
    /// The file was already present on disk.
    Skipped,
    /// Successfully downloaded.
    Finished,
    /// The last attempt failed with the given message.
    Error(String),
}

impl Status {
    /// Creates an error status, flattening the message onto a single line.
    ///
    /// ` - ` inside the message becomes `; ` so the status is always the
    /// last column of its ledger line.
    pub fn error(message: impl AsRef<str>) -> Self {
        let flat = message
            .as_ref()
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .replace(FIELD_SEPARATOR, SEPARATOR_REPLACEMENT);
        Self::Error(flat)
    }

    /// Returns the status label without the error message.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InQueue => "In Queue",
            Self::Downloading => "Downloading",
            Self::Skipped => "Skipped",
            Self::Finished => "Finished",
            Self::Error(_) => "Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "{ERROR_PREFIX}{message}"),
            other => write!(f, "{}", other.label()),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In Queue" => Ok(Self::InQueue),
            "Downloading" => Ok(Self::Downloading),
            "Skipped" => Ok(Self::Skipped),
            "Finished" => Ok(Self::Finished),
            other => other
                .strip_prefix(ERROR_PREFIX.trim_end())
                .filter(|rest| rest.is_empty() || rest.starts_with(' '))
                .map(|message| Self::Error(message.trim_start().to_string()))
                .ok_or_else(|| format!("invalid ledger status: {other}")),
        }
    }
}

/// One item's record in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// On-disk filename (`<id>_<resolved>`), fixed once assigned.
    pub filename: String,
    /// Current lifecycle state.
    pub status: Status,
}

impl LedgerEntry {
    /// Creates a new entry.
    pub fn new(filename: impl Into<String>, status: Status) -> Self {
        Self {
            filename: filename.into(),
            status,
        }
    }

    /// Creates a fresh `In Queue` entry.
    pub fn queued(filename: impl Into<String>) -> Self {
        Self::new(filename, Status::InQueue)
    }
}

/// Number of ledger entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub in_queue: usize,
    pub downloading: usize,
    pub skipped: usize,
    pub finished: usize,
    pub error: usize,
}

impl StatusCounts {
    /// Tallies the statuses of the given entries.
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry.status {
                Status::InQueue => counts.in_queue += 1,
                Status::Downloading => counts.downloading += 1,
                Status::Skipped => counts.skipped += 1,
                Status::Finished => counts.finished += 1,
                Status::Error(_) => counts.error += 1,
            }
        }
        counts
    }
}
