//! User-Agent string for manifest and media requests.

/// Product token sent with every request.
const PRODUCT: &str = "harvester";

/// Default User-Agent for HTTP requests (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (channel-media-downloader)")
}
