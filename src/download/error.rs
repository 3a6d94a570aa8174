//! Error types for media transfers.
//!
//! A [`DownloadError`] describes why fetching one item's bytes failed. The
//! engine records it in the ledger as `Error: <message>` and moves on; it never
//! aborts sibling downloads.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one item's media.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the media.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The item's locator is not a usable URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The item carries no locator, so there is nothing to fetch.
    #[error("message {item_id} has no media locator")]
    MissingLocator {
        /// The message id.
        item_id: i64,
    },

    /// Fewer bytes arrived than the server announced.
    #[error(
        "incomplete download for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Incomplete {
        /// Partial file path.
        path: PathBuf,
        /// Announced size in bytes.
        expected_bytes: u64,
        /// Received size in bytes.
        actual_bytes: u64,
    },

    /// The remote service reported a failure.
    #[error("remote error for message {item_id}: {message}")]
    Remote {
        /// The message id.
        item_id: i64,
        /// Failure description from the service.
        message: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an incomplete-transfer error.
    pub fn incomplete(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Incomplete {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a remote service error.
    pub fn remote(item_id: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            item_id,
            message: message.into(),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error lacks, so callers go through the constructors.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://example.com/file.pdf");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/file.pdf"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/file.pdf", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("https://example.com/file.pdf"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/1_photo_1.jpg"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/1_photo_1.jpg"), "Expected path in: {msg}");
    }

    #[test]
    fn test_download_error_missing_locator_display() {
        let msg = DownloadError::MissingLocator { item_id: 12 }.to_string();
        assert!(msg.contains("12"), "Expected id in: {msg}");
    }

    #[test]
    fn test_download_error_incomplete_display() {
        let msg = DownloadError::incomplete("/tmp/x.part", 100, 40).to_string();
        assert!(msg.contains("100"), "Expected expected size in: {msg}");
        assert!(msg.contains("40"), "Expected actual size in: {msg}");
    }

    #[test]
    fn test_download_error_remote_display() {
        let msg = DownloadError::remote(3, "FILE_REFERENCE_EXPIRED").to_string();
        assert_eq!(msg, "remote error for message 3: FILE_REFERENCE_EXPIRED");
    }
}
