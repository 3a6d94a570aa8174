//! Local filename derivation for message media.
//!
//! Names are computed from item attributes alone (no bytes are fetched), so
//! the same item always maps to the same file across runs.

use std::path::{Component, Path};

use crate::media::{MediaItem, MediaKind};

/// Extension used when neither the MIME table nor video attributes apply.
const FALLBACK_EXTENSION: &str = ".bin";

/// Extension used for unmapped documents that carry video attributes.
const VIDEO_EXTENSION: &str = ".mp4";

/// Resolves the base filename for an item's media.
///
/// - Photo: `photo_<id>.jpg`
/// - Document with a filename attribute: that name (unsafe characters replaced)
/// - Document without one: `document_<id><ext>`
///
/// Returns `None` when the item carries no recognizable media.
#[must_use]
pub fn resolve_filename(item: &MediaItem) -> Option<String> {
    match item.kind? {
        MediaKind::Photo => Some(format!("photo_{}.jpg", item.id)),
        MediaKind::Document => {
            if let Some(hint) = item.filename_hint.as_deref().filter(|h| !h.trim().is_empty()) {
                return Some(sanitize_filename(hint));
            }
            let ext = item
                .mime_type
                .as_deref()
                .and_then(extension_from_mime)
                .unwrap_or(if item.is_video {
                    VIDEO_EXTENSION
                } else {
                    FALLBACK_EXTENSION
                });
            Some(format!("document_{}{ext}", item.id))
        }
    }
}

/// Returns the on-disk filename: `<id>_<resolved>`.
///
/// The id prefix keeps names unique even when two items resolve to the same base name.
#[must_use]
pub fn local_filename(item: &MediaItem) -> Option<String> {
    resolve_filename(item).map(|name| format!("{}_{name}", item.id))
}

/// Maps a MIME type to a file extension (with leading dot).
#[must_use]
pub fn extension_from_mime(mime_type: &str) -> Option<&'static str> {
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/heic" => ".heic",
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        "video/x-msvideo" => ".avi",
        "audio/mpeg" => ".mp3",
        "audio/ogg" => ".ogg",
        "audio/mp4" | "audio/x-m4a" => ".m4a",
        "audio/wav" | "audio/x-wav" => ".wav",
        "application/pdf" => ".pdf",
        "application/zip" | "application/x-zip-compressed" => ".zip",
        "application/x-rar-compressed" | "application/vnd.rar" => ".rar",
        "application/x-7z-compressed" => ".7z",
        "application/gzip" => ".gz",
        "application/x-tar" => ".tar",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/epub+zip" => ".epub",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.android.package-archive" => ".apk",
        "text/plain" => ".txt",
        "text/html" => ".html",
        "text/csv" => ".csv",
        _ => return None,
    };
    Some(ext)
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Collapses a display name into a compact `[A-Za-z0-9._-]` token.
///
/// Used for the channel part of ledger file names.
pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            c if c.is_alphanumeric() || matches!(c, '-' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
