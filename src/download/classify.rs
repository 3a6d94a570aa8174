//! Decides what to do with an item given its ledger status.

use std::fmt;

use crate::ledger::{Entries, Status};

/// Action taken for an item at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadAction {
    /// Status is `In Queue`: download it.
    Download,
    /// Status is `Skipped`: the file was found on disk earlier.
    SkipAlreadyDone,
    /// Status is `Finished`: nothing to do.
    SkipAlreadyFinished,
    /// Status is `Downloading` or `Error`: reset to `In Queue` and download again.
    ///
    /// A surviving `Downloading` means a previous run stopped mid-transfer;
    /// errors are retried automatically on every run.
    ResetAndDownload,
}

impl fmt::Display for DownloadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Download => "download",
            Self::SkipAlreadyDone => "skip_already_done",
            Self::SkipAlreadyFinished => "skip_already_finished",
            Self::ResetAndDownload => "reset_and_download",
        };
        write!(f, "{label}")
    }
}

/// Maps a ledger status to its action.
#[must_use]
pub fn action_for(status: &Status) -> DownloadAction {
    match status {
        Status::Finished => DownloadAction::SkipAlreadyFinished,
        Status::Skipped => DownloadAction::SkipAlreadyDone,
        Status::InQueue => DownloadAction::Download,
        Status::Downloading | Status::Error(_) => DownloadAction::ResetAndDownload,
    }
}

/// Classifies an item by its ledger entry.
///
/// Returns `None` for items the ledger does not track; those never get a task.
#[must_use]
pub fn classify(item_id: i64, entries: &Entries) -> Option<DownloadAction> {
    entries.get(&item_id).map(|entry| action_for(&entry.status))
}
