//! JSON manifest message source.
//!
//! The manifest lists channels and their messages:
//!
//! ```json
//! {
//!   "channels": [
//!     {
//!       "id": 555,
//!       "name": "Space Photos",
//!       "username": "spacepics",
//!       "messages": [
//!         { "id": 10, "media": { "kind": "photo", "size": 1000, "url": "media/10.jpg" } },
//!         { "id": 12 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Media URLs may be relative; they resolve against the manifest location
//! (its URL, or its directory for a local file). `http`, `https` and `file`
//! locators can be fetched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::{MessageSource, ProgressCallback, SourceError};
use crate::download::DownloadError;
use crate::media::{ChannelRef, ContentFilter, MediaItem, MediaKind};
use crate::user_agent;

/// Connect timeout for manifest and media requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read buffer size for local `file` locators.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct Manifest {
    channels: Vec<ManifestChannel>,
}

#[derive(Debug, Deserialize)]
struct ManifestChannel {
    id: i64,
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    messages: Vec<ManifestMessage>,
}

#[derive(Debug, Deserialize)]
struct ManifestMessage {
    id: i64,
    #[serde(default)]
    media: Option<ManifestMedia>,
}

#[derive(Debug, Deserialize)]
struct ManifestMedia {
    kind: MediaTag,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    video: bool,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MediaTag {
    Photo,
    Document,
    /// Media the downloader does not handle (polls, web pages, ...).
    #[serde(other)]
    Other,
}

impl From<MediaTag> for Option<MediaKind> {
    fn from(tag: MediaTag) -> Self {
        match tag {
            MediaTag::Photo => Some(MediaKind::Photo),
            MediaTag::Document => Some(MediaKind::Document),
            MediaTag::Other => None,
        }
    }
}

/// Message source backed by a JSON manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    channels: Vec<ChannelRef>,
    messages: Vec<Vec<MediaItem>>,
    client: Client,
}

impl ManifestSource {
    /// Loads a manifest from a local path or an `http(s)` URL.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the manifest cannot be read, fetched or
    /// parsed.
    #[instrument(skip_all, fields(location = %location))]
    pub async fn load(location: &str) -> Result<Self, SourceError> {
        let client = build_client()?;

        let (raw, base_url) = if is_http_location(location) {
            let url = Url::parse(location).map_err(|_| SourceError::InvalidLocation {
                location: location.to_string(),
            })?;
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| SourceError::ManifestFetch {
                    url: location.to_string(),
                    source: e,
                })?;
            if !response.status().is_success() {
                return Err(SourceError::ManifestStatus {
                    url: location.to_string(),
                    status: response.status().as_u16(),
                });
            }
            let raw = response
                .text()
                .await
                .map_err(|e| SourceError::ManifestFetch {
                    url: location.to_string(),
                    source: e,
                })?;
            (raw, Some(url))
        } else {
            let path = Path::new(location);
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| SourceError::ManifestRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            (raw, directory_url(path))
        };

        let source = Self::parse(location, &raw, base_url, client)?;
        info!(channels = source.channels.len(), "manifest loaded");
        Ok(source)
    }

    /// Builds a source from manifest JSON.
    ///
    /// Relative media URLs resolve against `base_url`; without one they are
    /// kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ManifestParse`] for invalid JSON and
    /// [`SourceError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_json(json: &str, base_url: Option<Url>) -> Result<Self, SourceError> {
        Self::parse("<inline>", json, base_url, build_client()?)
    }

    fn parse(
        location: &str,
        raw: &str,
        base_url: Option<Url>,
        client: Client,
    ) -> Result<Self, SourceError> {
        let manifest: Manifest =
            serde_json::from_str(raw).map_err(|e| SourceError::manifest_parse(location, e))?;

        let mut channels = Vec::with_capacity(manifest.channels.len());
        let mut messages = Vec::with_capacity(manifest.channels.len());
        for channel in manifest.channels {
            let items = channel
                .messages
                .into_iter()
                .map(|message| to_media_item(message, base_url.as_ref()))
                .collect();
            channels.push(ChannelRef {
                id: channel.id,
                name: channel.name,
                username: channel.username.filter(|u| !u.is_empty()),
            });
            messages.push(items);
        }

        Ok(Self {
            channels,
            messages,
            client,
        })
    }

    async fn fetch_http(
        &self,
        url: &Url,
        part_path: &Path,
        declared_size: u64,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<u64, DownloadError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url.as_str())
            } else {
                DownloadError::network(url.as_str(), e)
            }
        })?;
        if !response.status().is_success() {
            return Err(DownloadError::http_status(
                url.as_str(),
                response.status().as_u16(),
            ));
        }

        let content_length = response.content_length();
        let total = content_length.unwrap_or(declared_size);

        let file = File::create(part_path)
            .await
            .map_err(|e| DownloadError::io(part_path, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::network(url.as_str(), e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(part_path, e))?;
            bytes_written += chunk.len() as u64;
            on_progress(bytes_written, total);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(part_path, e))?;

        if let Some(expected) = content_length
            && expected != bytes_written
        {
            return Err(DownloadError::incomplete(part_path, expected, bytes_written));
        }
        Ok(bytes_written)
    }
}

#[async_trait]
impl MessageSource for ManifestSource {
    async fn list_channels(&self) -> Result<Vec<ChannelRef>, SourceError> {
        Ok(self.channels.clone())
    }

    #[instrument(skip(self, channel), fields(channel_id = channel.id))]
    async fn list_messages(
        &self,
        channel: &ChannelRef,
        filter: ContentFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>, SourceError> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == channel.id)
            .ok_or(SourceError::UnknownChannel {
                channel_id: channel.id,
            })?;

        let items: Vec<MediaItem> = self.messages[index]
            .iter()
            .filter(|item| filter.matches(item))
            .take(limit)
            .cloned()
            .collect();
        debug!(found = items.len(), "messages listed");
        Ok(items)
    }

    #[instrument(skip_all, fields(item_id = item.id, dest = %dest.display()))]
    async fn fetch_media(
        &self,
        item: &MediaItem,
        dest: &Path,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(), DownloadError> {
        let locator = item
            .locator
            .as_deref()
            .ok_or(DownloadError::MissingLocator { item_id: item.id })?;
        let url = Url::parse(locator).map_err(|_| DownloadError::invalid_url(locator))?;
        let part_path = part_path(dest);

        let result = match url.scheme() {
            "http" | "https" => {
                self.fetch_http(&url, &part_path, item.declared_size, on_progress)
                    .await
            }
            "file" => copy_local(&url, &part_path, item.declared_size, on_progress).await,
            _ => Err(DownloadError::invalid_url(locator)),
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %part_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&part_path, dest).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(DownloadError::io(dest, e));
        }
        debug!(bytes, "media written");
        Ok(())
    }
}

fn build_client() -> Result<Client, SourceError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
        .map_err(SourceError::HttpClient)
}

fn is_http_location(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `file:` URL of the directory holding a local manifest.
fn directory_url(manifest_path: &Path) -> Option<Url> {
    let absolute = std::path::absolute(manifest_path).ok()?;
    Url::from_directory_path(absolute.parent()?).ok()
}

fn to_media_item(message: ManifestMessage, base_url: Option<&Url>) -> MediaItem {
    let Some(media) = message.media else {
        return MediaItem {
            id: message.id,
            kind: None,
            mime_type: None,
            declared_size: 0,
            filename_hint: None,
            is_video: false,
            locator: None,
        };
    };

    let kind: Option<MediaKind> = media.kind.into();
    let mime_type = match kind {
        Some(MediaKind::Photo) => media.mime_type.or_else(|| Some("image/jpeg".to_string())),
        _ => media.mime_type,
    };
    MediaItem {
        id: message.id,
        kind,
        mime_type,
        declared_size: media.size,
        filename_hint: media.file_name.filter(|n| !n.trim().is_empty()),
        is_video: media.video,
        locator: media.url.map(|raw| resolve_locator(&raw, base_url)),
    }
}

fn resolve_locator(raw: &str, base_url: Option<&Url>) -> String {
    if Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    base_url
        .and_then(|base| base.join(raw).ok())
        .map_or_else(|| raw.to_string(), String::from)
}

/// `<dest>.part`
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn copy_local(
    url: &Url,
    part_path: &Path,
    declared_size: u64,
    on_progress: &mut ProgressCallback<'_>,
) -> Result<u64, DownloadError> {
    let source_path = url
        .to_file_path()
        .map_err(|()| DownloadError::invalid_url(url.as_str()))?;
    let mut input = File::open(&source_path)
        .await
        .map_err(|e| DownloadError::io(&source_path, e))?;
    let total = match input.metadata().await {
        Ok(meta) => meta.len(),
        Err(_) => declared_size,
    };

    let output = File::create(part_path)
        .await
        .map_err(|e| DownloadError::io(part_path, e))?;
    let mut writer = BufWriter::new(output);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes_written: u64 = 0;

    loop {
        let read = input
            .read(&mut buffer)
            .await
            .map_err(|e| DownloadError::io(&source_path, e))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..read])
            .await
            .map_err(|e| DownloadError::io(part_path, e))?;
        bytes_written += read as u64;
        on_progress(bytes_written, total);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(part_path, e))?;
    Ok(bytes_written)
}
