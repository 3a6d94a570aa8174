//! Channel synchronization: one run of the downloader for one channel.
//!
//! [`sync_channel`] enumerates the channel's matching messages, opens and
//! initializes the channel ledger, and hands the items to the
//! [`DownloadEngine`]. The returned [`SyncReport`] feeds the run summary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::download::{
    DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, EngineError, ProgressRegistry,
};
use crate::ledger::{Ledger, LedgerError, StatusCounts, ledger_path};
use crate::media::{ChannelRef, ContentFilter};
use crate::source::{MessageSource, SourceError};

/// Default maximum number of messages enumerated per run.
pub const DEFAULT_LIMIT: usize = 2000;

/// Default output root.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Errors that end a channel run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Enumerating channels or messages failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The engine could not be created or a ledger write failed mid-run.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The ledger could not be read or initialized.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The source has no channels at all.
    #[error("no channels found")]
    NoChannels,

    /// The requested channel id is not in the source.
    #[error("channel {channel_id} not found; available channels:\n{available}")]
    ChannelNotFound {
        /// Requested channel id.
        channel_id: i64,
        /// Numbered channel listing.
        available: String,
    },

    /// Several channels exist and none was requested.
    #[error("several channels available, pick one with --channel <ID>:\n{available}")]
    AmbiguousChannel {
        /// Numbered channel listing.
        available: String,
    },
}

/// Settings for one channel run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Root directory holding the ledger files and the per-filter folders.
    pub output_root: PathBuf,
    /// Content type to download.
    pub filter: ContentFilter,
    /// Downloads per group.
    pub concurrency: usize,
    /// Maximum number of matching messages to enumerate.
    pub limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            filter: ContentFilter::default(),
            concurrency: DEFAULT_CONCURRENCY,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Outcome of one channel run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The synchronized channel.
    pub channel: ChannelRef,
    /// Content type of the run.
    pub filter: ContentFilter,
    /// Number of matching messages enumerated.
    pub found: usize,
    /// Per-run engine statistics.
    pub stats: DownloadStats,
    /// Ledger status counts after the run.
    pub counts: StatusCounts,
    /// Ledger file of the channel.
    pub ledger_path: PathBuf,
    /// Folder the media was written to.
    pub dest_dir: PathBuf,
}

impl SyncReport {
    /// Returns true when the source had no matching media.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.found == 0
    }
}

/// Renders the `index. channel` listing shown to users.
#[must_use]
pub fn format_channel_list(channels: &[ChannelRef]) -> String {
    channels
        .iter()
        .enumerate()
        .map(|(index, channel)| format!("{}. {channel}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Picks the channel to synchronize.
///
/// With `requested` the channel must exist. Without it, a single channel is
/// selected automatically.
///
/// # Errors
///
/// Returns [`SyncError::NoChannels`], [`SyncError::ChannelNotFound`] or
/// [`SyncError::AmbiguousChannel`].
pub fn select_channel(
    channels: &[ChannelRef],
    requested: Option<i64>,
) -> Result<ChannelRef, SyncError> {
    if channels.is_empty() {
        return Err(SyncError::NoChannels);
    }
    match requested {
        Some(channel_id) => channels
            .iter()
            .find(|c| c.id == channel_id)
            .cloned()
            .ok_or_else(|| SyncError::ChannelNotFound {
                channel_id,
                available: format_channel_list(channels),
            }),
        None if channels.len() == 1 => Ok(channels[0].clone()),
        None => Err(SyncError::AmbiguousChannel {
            available: format_channel_list(channels),
        }),
    }
}

/// Downloads the matching media of one channel.
///
/// Files land in `<output_root>/<filter folder>`; the ledger lives at
/// [`ledger_path`]. When no message matches, nothing is written.
///
/// # Errors
///
/// Returns a [`SyncError`] for invalid options, source failures and ledger
/// failures. Failed downloads are not errors; they show up in the report.
#[instrument(
    skip_all,
    fields(channel_id = channel.id, filter = %options.filter, concurrency = options.concurrency)
)]
pub async fn sync_channel(
    source: Arc<dyn MessageSource>,
    channel: &ChannelRef,
    options: &SyncOptions,
    progress: Arc<ProgressRegistry>,
) -> Result<SyncReport, SyncError> {
    let engine = DownloadEngine::new(options.concurrency)?;
    let dest_dir = options.output_root.join(options.filter.folder_name());
    let ledger_file = ledger_path(&options.output_root, channel);

    let items = source
        .list_messages(channel, options.filter, options.limit)
        .await?;
    info!(found = items.len(), "messages with matching media");

    let mut report = SyncReport {
        channel: channel.clone(),
        filter: options.filter,
        found: items.len(),
        stats: DownloadStats::new(),
        counts: StatusCounts::default(),
        ledger_path: ledger_file,
        dest_dir,
    };
    if items.is_empty() {
        return Ok(report);
    }

    tokio::fs::create_dir_all(&report.dest_dir)
        .await
        .map_err(|e| SyncError::CreateDir {
            path: report.dest_dir.clone(),
            source: e,
        })?;

    let ledger = Arc::new(Ledger::open(&report.ledger_path, channel.id, &report.dest_dir).await?);
    ledger.begin_run(&items).await?;

    report.stats = engine
        .run(
            &items,
            &report.dest_dir,
            Arc::clone(&ledger),
            source,
            progress,
        )
        .await?;
    report.counts = ledger.counts().await;

    info!(
        downloaded = report.stats.completed(),
        failed = report.stats.failed(),
        skipped = report.stats.skipped(),
        ignored = report.stats.ignored(),
        "channel sync complete"
    );
    Ok(report)
}
