//! Message sources: where channels, messages and media bytes come from.
//!
//! The engine only depends on the [`MessageSource`] trait. The crate ships
//! [`ManifestSource`], which reads channels from a JSON manifest and fetches
//! media over HTTP.

mod manifest;

pub use manifest::ManifestSource;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::download::DownloadError;
use crate::media::{ChannelRef, ContentFilter, MediaItem};

/// Progress callback: `(cumulative_bytes, total_bytes)`.
pub type ProgressCallback<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// Provider of channels, messages and media bytes.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Lists the channels available to this source.
    async fn list_channels(&self) -> Result<Vec<ChannelRef>, SourceError>;

    /// Lists up to `limit` messages of `channel` whose media matches `filter`.
    async fn list_messages(
        &self,
        channel: &ChannelRef,
        filter: ContentFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>, SourceError>;

    /// Writes the item's media to `dest`, reporting cumulative progress.
    ///
    /// `dest` must not be left behind as a partial file on failure.
    async fn fetch_media(
        &self,
        item: &MediaItem,
        dest: &Path,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(), DownloadError>;
}

/// Errors raised while enumerating channels or messages.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        /// Manifest path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest URL could not be fetched.
    #[error("failed to fetch manifest {url}: {source}")]
    ManifestFetch {
        /// Manifest URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The manifest URL answered with an error status.
    #[error("HTTP {status} fetching manifest {url}")]
    ManifestStatus {
        /// Manifest URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The manifest is not valid JSON for the expected layout.
    #[error("invalid manifest {location}: {source}")]
    ManifestParse {
        /// Manifest path or URL.
        location: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest location looks like a URL but does not parse as one.
    #[error("invalid manifest URL: {location}")]
    InvalidLocation {
        /// The rejected location.
        location: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The requested channel is not known to the source.
    #[error("channel {channel_id} not found")]
    UnknownChannel {
        /// Requested channel id.
        channel_id: i64,
    },
}

impl SourceError {
    /// Creates a manifest parse error.
    pub fn manifest_parse(location: impl Into<String>, source: serde_json::Error) -> Self {
        Self::ManifestParse {
            location: location.into(),
            source,
        }
    }
}
