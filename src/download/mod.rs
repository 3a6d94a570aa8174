//! Download pipeline: filename resolution, action classification, batch
//! scheduling and progress reporting.
//!
//! # Overview
//!
//! - [`resolve_filename`] and [`local_filename`] derive the on-disk name of an
//!   item without fetching anything
//! - [`classify`] maps a ledger status to a [`DownloadAction`]
//! - [`DownloadEngine`] runs admitted items in bounded groups
//! - [`ProgressRegistry`] hands each task a [`ProgressHandle`]

mod classify;
mod engine;
mod error;
pub(crate) mod filename;
mod progress;

pub use classify::{DownloadAction, action_for, classify};
pub use engine::{DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, EngineError};
pub use error::DownloadError;
pub use filename::{extension_from_mime, local_filename, resolve_filename};
pub use progress::{
    HiddenProgress, ProgressHandle, ProgressRegistry, ProgressRow, ProgressSink, RowOutcome,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
