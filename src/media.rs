//! Media items, channels, and content filters.
//!
//! These are the values handed to the engine by a [`crate::source::MessageSource`].
//! They are immutable once produced by the source.

use std::fmt;
use std::str::FromStr;

/// Kind of media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A photo. Always stored as JPEG.
    Photo,
    /// Any document (files, videos, archives, ...).
    Document,
}

/// A message's media attachment as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Message id, unique within a channel and stable across runs.
    pub id: i64,
    /// Attached media kind, `None` when the message carries no recognizable media.
    pub kind: Option<MediaKind>,
    /// MIME type reported for documents.
    pub mime_type: Option<String>,
    /// Size in bytes as declared by the source (0 when unknown).
    pub declared_size: u64,
    /// Original filename attribute, if the document has one.
    pub filename_hint: Option<String>,
    /// Whether the document carries video-stream attributes.
    pub is_video: bool,
    /// Opaque handle the source uses to fetch the bytes.
    pub locator: Option<String>,
}

impl MediaItem {
    /// Creates a photo item.
    #[must_use]
    pub fn photo(id: i64, declared_size: u64) -> Self {
        Self {
            id,
            kind: Some(MediaKind::Photo),
            mime_type: Some("image/jpeg".to_string()),
            declared_size,
            filename_hint: None,
            is_video: false,
            locator: None,
        }
    }

    /// Creates a document item with the given MIME type.
    #[must_use]
    pub fn document(id: i64, mime_type: Option<&str>, declared_size: u64) -> Self {
        Self {
            id,
            kind: Some(MediaKind::Document),
            mime_type: mime_type.map(str::to_string),
            declared_size,
            filename_hint: None,
            is_video: false,
            locator: None,
        }
    }

    /// Sets the original filename attribute.
    #[must_use]
    pub fn with_filename_hint(mut self, name: impl Into<String>) -> Self {
        self.filename_hint = Some(name.into());
        self
    }

    /// Marks the document as carrying video attributes.
    #[must_use]
    pub fn with_video(mut self, is_video: bool) -> Self {
        self.is_video = is_video;
        self
    }

    /// Sets the locator used to fetch the bytes.
    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Returns true when the item has any media attached.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.kind.is_some()
    }

    fn mime_is(&self, expected: &str) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.eq_ignore_ascii_case(expected))
    }
}

/// A channel the source can enumerate messages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    /// Numeric channel id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Public username, when the channel has one.
    pub username: Option<String>,
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(username) = &self.username {
            write!(f, " (@{username})")?;
        }
        write!(f, " (ID: {})", self.id)
    }
}

/// Content-type selection for a run.
///
/// Each filter downloads into its own folder under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFilter {
    /// Photos.
    Images,
    /// Documents with video attributes or a `video/*` MIME type.
    Videos,
    /// `application/pdf` documents.
    Pdfs,
    /// `application/zip` documents.
    Zips,
    /// Any message with media.
    #[default]
    All,
}

impl ContentFilter {
    /// All filters, in menu order.
    pub const ALL: [Self; 5] = [Self::Images, Self::Videos, Self::Pdfs, Self::Zips, Self::All];

    /// Returns the CLI/config label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Pdfs => "pdfs",
            Self::Zips => "zips",
            Self::All => "all",
        }
    }

    /// Returns the destination folder name under the output root.
    #[must_use]
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Pdfs => "pdfs",
            Self::Zips => "zips",
            Self::All => "all_media",
        }
    }

    /// Returns true when the item belongs to this content type.
    #[must_use]
    pub fn matches(&self, item: &MediaItem) -> bool {
        match (self, item.kind) {
            (_, None) => false,
            (Self::All, Some(_)) | (Self::Images, Some(MediaKind::Photo)) => true,
            (Self::Videos, Some(MediaKind::Document)) => {
                item.is_video
                    || item
                        .mime_type
                        .as_deref()
                        .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("video/"))
            }
            (Self::Pdfs, Some(MediaKind::Document)) => item.mime_is("application/pdf"),
            (Self::Zips, Some(MediaKind::Document)) => item.mime_is("application/zip"),
            _ => false,
        }
    }
}

impl fmt::Display for ContentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "images" | "photos" => Ok(Self::Images),
            "videos" => Ok(Self::Videos),
            "pdfs" => Ok(Self::Pdfs),
            "zips" => Ok(Self::Zips),
            "all" | "all_media" => Ok(Self::All),
            other => Err(format!(
                "invalid content filter: {other} (expected images, videos, pdfs, zips or all)"
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_media(id: i64) -> MediaItem {
        MediaItem {
            kind: None,
            ..MediaItem::photo(id, 10)
        }
    }

    #[test]
    fn test_images_filter_only_matches_photos() {
        assert!(ContentFilter::Images.matches(&MediaItem::photo(1, 10)));
        assert!(!ContentFilter::Images.matches(&MediaItem::document(2, Some("image/png"), 10)));
    }

    #[test]
    fn test_videos_filter_uses_attributes_or_mime() {
        let flagged = MediaItem::document(1, Some("application/octet-stream"), 10).with_video(true);
        let by_mime = MediaItem::document(2, Some("video/mp4"), 10);
        let plain = MediaItem::document(3, Some("application/pdf"), 10);

        assert!(ContentFilter::Videos.matches(&flagged));
        assert!(ContentFilter::Videos.matches(&by_mime));
        assert!(!ContentFilter::Videos.matches(&plain));
        assert!(!ContentFilter::Videos.matches(&MediaItem::photo(4, 10)));
    }

    #[test]
    fn test_pdf_and_zip_filters_compare_mime_case_insensitively() {
        let pdf = MediaItem::document(1, Some("Application/PDF"), 10);
        let zip = MediaItem::document(2, Some("application/zip"), 10);

        assert!(ContentFilter::Pdfs.matches(&pdf));
        assert!(!ContentFilter::Pdfs.matches(&zip));
        assert!(ContentFilter::Zips.matches(&zip));
        assert!(!ContentFilter::Zips.matches(&MediaItem::document(3, None, 10)));
    }

    #[test]
    fn test_all_filter_requires_media() {
        assert!(ContentFilter::All.matches(&MediaItem::photo(1, 10)));
        assert!(ContentFilter::All.matches(&MediaItem::document(2, None, 0)));
        assert!(!ContentFilter::All.matches(&no_media(3)));
    }

    #[test]
    fn test_filter_parse_and_folder_names() {
        for filter in ContentFilter::ALL {
            assert_eq!(filter.as_str().parse::<ContentFilter>().unwrap(), filter);
        }
        assert_eq!(ContentFilter::All.folder_name(), "all_media");
        assert_eq!("PDFs".parse::<ContentFilter>().unwrap(), ContentFilter::Pdfs);
        assert!("music".parse::<ContentFilter>().is_err());
    }

    #[test]
    fn test_channel_display_includes_username_and_id() {
        let channel = ChannelRef {
            id: 77,
            name: "Archive".to_string(),
            username: Some("archive".to_string()),
        };
        assert_eq!(channel.to_string(), "Archive (@archive) (ID: 77)");

        let anonymous = ChannelRef {
            username: None,
            ..channel
        };
        assert_eq!(anonymous.to_string(), "Archive (ID: 77)");
    }
}
