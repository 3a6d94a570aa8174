//! Batch scheduler for concurrent media downloads.
//!
//! The [`DownloadEngine`] takes the items enumerated for a run, decides per
//! item whether it needs a transfer (see [`DownloadAction`]), and
//! downloads the admitted ones in groups of at most `concurrency` tasks. A
//! group must settle completely before the next one starts.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{DownloadEngine, ProgressRegistry};
//! use harvester_core::ledger::Ledger;
//! use harvester_core::source::{ManifestSource, MessageSource};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(ManifestSource::load("channels.json").await?);
//! let channel = source.list_channels().await?.remove(0);
//! let items = source.list_messages(&channel, Default::default(), 100).await?;
//! let dest = Path::new("downloads/all_media");
//! let ledger = Arc::new(Ledger::open(Path::new("downloads/log.txt"), channel.id, dest).await?);
//! ledger.begin_run(&items).await?;
//!
//! let engine = DownloadEngine::new(5)?;
//! let stats = engine
//!     .run(&items, dest, ledger, source, Arc::new(ProgressRegistry::hidden()))
//!     .await?;
//! println!("downloaded {}, failed {}", stats.completed(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::classify::{DownloadAction, action_for};
use super::filename::local_filename;
use super::progress::{ProgressRegistry, RowOutcome};
use crate::ledger::{Ledger, LedgerError, Status};
use crate::media::MediaItem;
use crate::source::MessageSource;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
///
/// Upper bound on simultaneous transfers and progress rows per group.
const MAX_CONCURRENCY: usize = 100;

/// Default number of downloads per group.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The ledger could not be persisted. Fatal to the run.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// What became of one item during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Finished,
    Failed,
    Skipped,
    Ignored,
}

/// Statistics from a download run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    completed: usize,
    failed: usize,
    skipped: usize,
    ignored: usize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items downloaded in this run.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Returns the number of items whose download failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the number of items skipped as already done.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns the number of items with nothing to download.
    ///
    /// Zero-size items, items without recognizable media, and repeated ids.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Finished => self.completed += 1,
            TaskOutcome::Failed => self.failed += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// An item admitted for download, with the filename its ledger entry holds.
#[derive(Debug, Clone)]
struct Admitted {
    item: MediaItem,
    filename: String,
}

/// Download engine driving groups of concurrent transfers.
///
/// # Concurrency Model
///
/// - Admitted items are split into contiguous groups of `concurrency`
/// - Each item of a group runs in its own Tokio task
/// - The engine awaits every task of a group before starting the next
/// - All ledger writes go through [`Ledger::update`], which serializes them
///
/// Per-item fetch failures are recorded as `Error: <message>` and never
/// affect sibling tasks. A task that panics is recorded the same way. A ledger write failure ends the run once the
/// current group has settled.
#[derive(Debug, Clone, Copy)]
pub struct DownloadEngine {
    concurrency: usize,
}

impl DownloadEngine {
    /// Creates a new engine running up to `concurrency` downloads per group.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use harvester_core::download::DownloadEngine;
    ///
    /// let engine = DownloadEngine::new(5).unwrap();
    /// assert_eq!(engine.concurrency(), 5);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        debug!(concurrency, "creating download engine");
        Ok(Self { concurrency })
    }

    /// Returns the configured group size.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every item of `items` that the ledger says still needs it.
    ///
    /// Items are admitted in input order, each id at most once. Items with
    /// status `Downloading` or `Error` are reset to `In Queue` first. Files
    /// land in `dest_dir` under the filename recorded in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] if a ledger write fails. Individual
    /// download failures do NOT cause this method to error.
    #[instrument(
        skip_all,
        fields(items = items.len(), dest_dir = %dest_dir.display())
    )]
    pub async fn run(
        &self,
        items: &[MediaItem],
        dest_dir: &Path,
        ledger: Arc<Ledger>,
        source: Arc<dyn MessageSource>,
        progress: Arc<ProgressRegistry>,
    ) -> Result<DownloadStats, EngineError> {
        let mut stats = DownloadStats::new();
        let admitted = self.admit(items, &ledger, &mut stats).await?;

        info!(
            admitted = admitted.len(),
            skipped = stats.skipped(),
            ignored = stats.ignored(),
            "starting downloads"
        );

        for (index, group) in admitted.chunks(self.concurrency).enumerate() {
            debug!(group = index + 1, size = group.len(), "starting group");

            let mut handles = Vec::with_capacity(group.len());
            for admitted in group {
                let task_input = admitted.clone();
                let dest_dir = dest_dir.to_path_buf();
                let ledger = Arc::clone(&ledger);
                let source = Arc::clone(&source);
                let progress = Arc::clone(&progress);

                let handle = tokio::spawn(async move {
                    download_item(task_input, dest_dir, &ledger, source.as_ref(), &progress).await
                });
                handles.push((admitted, handle));
            }

            // Every task of the group settles before a ledger error ends the run.
            let mut first_error = None;
            for (admitted, handle) in handles {
                let settled = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(item_id = admitted.item.id, error = %e, "download task panicked");
                        ledger
                            .update(
                                admitted.item.id,
                                &admitted.filename,
                                Status::error(format!("download task panicked: {e}")),
                            )
                            .await
                            .map(|()| TaskOutcome::Failed)
                            .map_err(EngineError::from)
                    }
                };
                match settled {
                    Ok(outcome) => stats.record(outcome),
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = first_error {
                warn!(group = index + 1, error = %e, "ledger write failed, stopping run");
                return Err(e);
            }
        }

        info!(
            completed = stats.completed(),
            failed = stats.failed(),
            skipped = stats.skipped(),
            ignored = stats.ignored(),
            "downloads complete"
        );
        Ok(stats)
    }

    /// Classifies every item and returns the ones that get a task.
    async fn admit(
        &self,
        items: &[MediaItem],
        ledger: &Ledger,
        stats: &mut DownloadStats,
    ) -> Result<Vec<Admitted>, EngineError> {
        let entries = ledger.snapshot().await;
        let mut seen = HashSet::new();
        let mut admitted = Vec::new();

        for item in items {
            if !seen.insert(item.id) {
                debug!(item_id = item.id, "duplicate item id, ignoring");
                stats.record(TaskOutcome::Ignored);
                continue;
            }
            let Some(entry) = entries.get(&item.id) else {
                debug!(
                    item_id = item.id,
                    size = item.declared_size,
                    "item not tracked by ledger, ignoring"
                );
                stats.record(TaskOutcome::Ignored);
                continue;
            };
            let action = action_for(&entry.status);

            debug!(item_id = item.id, %action, "classified item");
            match action {
                DownloadAction::SkipAlreadyDone | DownloadAction::SkipAlreadyFinished => {
                    stats.record(TaskOutcome::Skipped);
                    continue;
                }
                DownloadAction::ResetAndDownload => {
                    ledger
                        .update(item.id, &entry.filename, Status::InQueue)
                        .await?;
                }
                DownloadAction::Download => {}
            }
            admitted.push(Admitted {
                item: item.clone(),
                filename: entry.filename.clone(),
            });
        }
        Ok(admitted)
    }
}

/// Runs one download task.
///
/// Fetch failures are recorded in the ledger and returned as
/// [`TaskOutcome::Failed`]; only ledger errors propagate.
#[instrument(skip_all, fields(item_id = admitted.item.id, filename = %admitted.filename))]
async fn download_item(
    admitted: Admitted,
    dest_dir: PathBuf,
    ledger: &Ledger,
    source: &dyn MessageSource,
    progress: &ProgressRegistry,
) -> Result<TaskOutcome, EngineError> {
    let Admitted { item, filename } = admitted;

    if item.declared_size == 0 || local_filename(&item).is_none() {
        debug!("nothing to download");
        return Ok(TaskOutcome::Ignored);
    }

    ledger
        .update(item.id, &filename, Status::Downloading)
        .await?;

    let dest = dest_dir.join(&filename);
    let mut handle = progress.open(item.declared_size, &filename);
    let result = {
        let mut on_progress = |cumulative: u64, _total: u64| handle.observe(cumulative);
        source.fetch_media(&item, &dest, &mut on_progress).await
    };

    match result {
        Ok(()) => {
            handle.close(RowOutcome::Finished);
            ledger.update(item.id, &filename, Status::Finished).await?;
            debug!(path = %dest.display(), "download completed");
            Ok(TaskOutcome::Finished)
        }
        Err(e) => {
            handle.close(RowOutcome::Failed);
            warn!(error = %e, "download failed");
            ledger
                .update(item.id, &filename, Status::error(e.to_string()))
                .await?;
            Ok(TaskOutcome::Failed)
        }
    }
}
