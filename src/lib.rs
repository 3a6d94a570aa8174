//! Harvester Core Library
//!
//! Resumable, ledger-tracked downloading of channel media. Each channel run
//! enumerates messages from a [`MessageSource`], records every item in a
//! plain-text status ledger, and downloads what is still missing in bounded
//! concurrent groups. An interrupted run resumes from the ledger without
//! fetching finished items again.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`media`] - Media items, channels and content filters
//! - [`ledger`] - Per-channel status ledger (load, reconcile, rewrite)
//! - [`download`] - Filename resolution, action classification, the batch
//!   engine and progress reporting
//! - [`source`] - The message source trait and the JSON manifest adapter
//! - [`sync`] - One channel run from enumeration to summary

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod ledger;
pub mod media;
pub mod source;
pub mod sync;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_CONCURRENCY, DownloadAction, DownloadEngine, DownloadError, DownloadStats,
    EngineError, HiddenProgress, ProgressHandle, ProgressRegistry, ProgressRow, ProgressSink,
    RowOutcome, classify, local_filename, resolve_filename,
};
pub use ledger::{Ledger, LedgerEntry, LedgerError, Status, StatusCounts, ledger_path};
pub use media::{ChannelRef, ContentFilter, MediaItem, MediaKind};
pub use source::{ManifestSource, MessageSource, SourceError};
pub use sync::{
    DEFAULT_LIMIT, DEFAULT_OUTPUT_DIR, SyncError, SyncOptions, SyncReport, format_channel_list,
    select_channel, sync_channel,
};
