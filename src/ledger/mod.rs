//! Per-channel download status ledger.
//!
//! The ledger is a plain-text file with one line per item:
//!
//! ```text
//! 2024-05-17 09:03:07 - Channel 555 - Message 10: 10_photo_10.jpg - Finished
//! ```
//!
//! The file is the full serialization of the in-memory map. Every mutation
//! rewrites it wholesale (temp file + rename), so after each write the file
//! reflects the map exactly. Entries are never pruned from the file, even when
//! the source stops enumerating their items.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::ledger::{Ledger, Status};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Ledger::open(Path::new("downloads/download_log_1_news.txt"), 1, Path::new("downloads/images")).await?;
//! ledger.update(10, "10_photo_10.jpg", Status::Finished).await?;
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod line;

pub use entry::{LedgerEntry, Status, StatusCounts};
pub use error::LedgerError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::download::filename::{local_filename, sanitize_filename_component};
use crate::media::{ChannelRef, MediaItem};

/// Ledger contents keyed by item id.
pub type Entries = BTreeMap<i64, LedgerEntry>;

/// Returns the ledger path for a channel under the output root.
///
/// `<output_root>/download_log_<channel_id>_<sanitized name>.txt`
#[must_use]
pub fn ledger_path(output_root: &Path, channel: &ChannelRef) -> PathBuf {
    let name = sanitize_filename_component(&channel.name);
    let file_name = if name.is_empty() {
        format!("download_log_{}.txt", channel.id)
    } else {
        format!("download_log_{}_{name}.txt", channel.id)
    };
    output_root.join(file_name)
}

/// Loads the entries of `channel_id` from a ledger file.
///
/// A missing file yields an empty map. Malformed lines and lines recorded for
/// other channels are skipped. When an item appears on several lines the last
/// one wins, so append-style logs load as their latest state.
///
/// # Errors
///
/// Returns [`LedgerError::Read`] if the file exists but cannot be read.
#[instrument(skip_all, fields(path = %path.display(), channel_id = channel_id))]
pub async fn load(path: &Path, channel_id: i64) -> Result<Entries, LedgerError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no ledger yet");
            return Ok(Entries::new());
        }
        Err(e) => return Err(LedgerError::read(path, e)),
    };

    let mut entries = Entries::new();
    let mut skipped = 0usize;
    for (index, raw_line) in raw.lines().enumerate() {
        let text = raw_line.trim_end_matches('\r');
        if text.trim().is_empty() {
            continue;
        }
        match line::parse_line(text) {
            Ok(parsed) if parsed.channel_id == channel_id => {
                entries.insert(parsed.item_id, parsed.entry);
            }
            Ok(parsed) => {
                debug!(
                    line = index + 1,
                    other_channel = parsed.channel_id,
                    "skipping ledger line for another channel"
                );
            }
            Err(reason) => {
                skipped += 1;
                debug!(line = index + 1, reason, "skipping malformed ledger line");
            }
        }
    }

    debug!(entries = entries.len(), skipped, "ledger loaded");
    Ok(entries)
}

/// Marks `In Queue` entries whose file already exists in `dest_dir` as `Skipped`.
///
/// Covers runs that wrote the file but stopped before recording `Finished`.
pub async fn reconcile_with_filesystem(dest_dir: &Path, mut entries: Entries) -> Entries {
    for (item_id, entry) in &mut entries {
        if entry.status != Status::InQueue {
            continue;
        }
        let candidate = dest_dir.join(&entry.filename);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            debug!(item_id, filename = %entry.filename, "file already on disk, marking skipped");
            entry.status = Status::Skipped;
        }
    }
    entries
}

/// Builds the entries for the items enumerated in the current run.
///
/// Items with a resolvable filename and a non-zero size keep their existing
/// entry or get a fresh `In Queue` one. Items not enumerated now are left out
/// of the returned map.
#[must_use]
pub fn initialize(items: &[MediaItem], existing: &Entries) -> Entries {
    let mut current = Entries::new();
    for item in items {
        if item.declared_size == 0 {
            continue;
        }
        let Some(filename) = local_filename(item) else {
            continue;
        };
        let entry = existing
            .get(&item.id)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::queued(filename));
        current.insert(item.id, entry);
    }
    current
}

/// Rewrites the whole ledger file from `entries`.
///
/// Every line carries the current write time.
async fn write_entries(path: &Path, channel_id: i64, entries: &Entries) -> Result<(), LedgerError> {
    let written_at = Local::now();
    let mut content = String::new();
    for (item_id, entry) in entries {
        content.push_str(&line::format_line(&written_at, channel_id, *item_id, entry));
        content.push('\n');
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LedgerError::write(path, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, content.as_bytes())
        .await
        .map_err(|e| LedgerError::write(path, e))?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(LedgerError::write(path, e));
    }
    Ok(())
}

/// Durable status ledger for one channel.
///
/// All mutations go through [`Ledger::update`] (or [`Ledger::begin_run`]),
/// which hold a single lock across the map change and the file rewrite.
/// Concurrent tasks therefore never lose each other's updates.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    channel_id: i64,
    entries: Mutex<Entries>,
}

impl Ledger {
    /// Loads the ledger at `path` and reconciles it with `dest_dir`.
    ///
    /// Nothing is written until the first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Read`] if an existing ledger cannot be read.
    #[instrument(skip_all, fields(path = %path.display(), channel_id = channel_id))]
    pub async fn open(path: &Path, channel_id: i64, dest_dir: &Path) -> Result<Self, LedgerError> {
        let entries = load(path, channel_id).await?;
        let entries = reconcile_with_filesystem(dest_dir, entries).await;
        Ok(Self::from_entries(path, channel_id, entries))
    }

    /// Wraps already-loaded entries.
    #[must_use]
    pub fn from_entries(path: impl Into<PathBuf>, channel_id: i64, entries: Entries) -> Self {
        Self {
            path: path.into(),
            channel_id,
            entries: Mutex::new(entries),
        }
    }

    /// Registers the items enumerated for this run and rewrites the file.
    ///
    /// Returns the run snapshot produced by [`initialize`]. Entries of items
    /// that are no longer enumerated stay in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Write`] if the file cannot be rewritten.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn begin_run(&self, items: &[MediaItem]) -> Result<Entries, LedgerError> {
        let mut entries = self.entries.lock().await;
        let current = initialize(items, &entries);
        for (item_id, entry) in &current {
            entries.entry(*item_id).or_insert_with(|| entry.clone());
        }
        write_entries(&self.path, self.channel_id, &entries).await?;
        debug!(current = current.len(), total = entries.len(), "ledger initialized for run");
        Ok(current)
    }

    /// Sets the status of one item and rewrites the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Write`] if the file cannot be rewritten. The
    /// in-memory map keeps the new status in that case.
    #[instrument(level = "debug", skip(self, filename))]
    pub async fn update(
        &self,
        item_id: i64,
        filename: &str,
        status: Status,
    ) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        entries.insert(item_id, LedgerEntry::new(filename, status));
        write_entries(&self.path, self.channel_id, &entries).await
    }

    /// Returns the current status for an item.
    pub async fn status_of(&self, item_id: i64) -> Option<Status> {
        self.entries
            .lock()
            .await
            .get(&item_id)
            .map(|entry| entry.status.clone())
    }

    /// Returns a copy of all entries.
    pub async fn snapshot(&self) -> Entries {
        self.entries.lock().await.clone()
    }

    /// Returns the number of entries per status.
    pub async fn counts(&self) -> StatusCounts {
        StatusCounts::tally(self.entries.lock().await.values())
    }
}
