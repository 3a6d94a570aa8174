//! Text format of a single ledger line.
//!
//! `<timestamp> - Channel <channel_id> - Message <item_id>: <filename> - <status>`

use chrono::{DateTime, Local};

use super::entry::{FIELD_SEPARATOR, LedgerEntry, Status};

/// Timestamp layout written at the start of every line.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A successfully parsed ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LedgerLine {
    pub(crate) channel_id: i64,
    pub(crate) item_id: i64,
    pub(crate) entry: LedgerEntry,
}

/// Renders one ledger line (without trailing newline).
///
/// The status column never contains the separator, so it can be read back
/// from the end of the line whatever the filename holds.
pub(crate) fn format_line(
    written_at: &DateTime<Local>,
    channel_id: i64,
    item_id: i64,
    entry: &LedgerEntry,
) -> String {
    let status = match &entry.status {
        Status::Error(message) if message.contains(FIELD_SEPARATOR) => {
            Status::error(message).to_string()
        }
        other => other.to_string(),
    };
    format!(
        "{} - Channel {channel_id} - Message {item_id}: {} - {status}",
        written_at.format(TIMESTAMP_FORMAT),
        entry.filename,
    )
}

/// Parses one ledger line.
///
/// The error is a short reason used for diagnostics only.
pub(crate) fn parse_line(line: &str) -> Result<LedgerLine, &'static str> {
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let timestamp = fields.next().unwrap_or("").trim();
    if timestamp.is_empty() {
        return Err("missing timestamp");
    }
    let channel = fields.next().ok_or("missing channel field")?;
    let tail = fields.next().ok_or("missing message field")?;

    let channel_id = channel
        .strip_prefix("Channel ")
        .ok_or("malformed channel field")?
        .trim()
        .parse::<i64>()
        .map_err(|_| "non-numeric channel id")?;

    let (message, rest) = tail.split_once(": ").ok_or("missing message separator")?;
    let item_id = message
        .strip_prefix("Message ")
        .ok_or("malformed message field")?
        .trim()
        .parse::<i64>()
        .map_err(|_| "non-numeric message id")?;

    let (filename, status) = split_filename_and_status(rest).ok_or("missing status")?;
    if filename.is_empty() {
        return Err("empty filename");
    }

    Ok(LedgerLine {
        channel_id,
        item_id,
        entry: LedgerEntry::new(filename, status),
    })
}

/// Splits `<filename> - <status>`.
///
/// Lines written by [`format_line`] always carry the status after the last
/// separator. Logs from older tools may hold separators inside error
/// messages; those are matched at the first separator followed by an error
/// status.
fn split_filename_and_status(rest: &str) -> Option<(&str, Status)> {
    if let Some((filename, last)) = rest.rsplit_once(FIELD_SEPARATOR)
        && let Ok(status) = last.parse::<Status>()
    {
        return Some((filename, status));
    }

    rest.match_indices(FIELD_SEPARATOR).find_map(|(index, _)| {
        let candidate = &rest[index + FIELD_SEPARATOR.len()..];
        match candidate.parse::<Status>() {
            Ok(status @ Status::Error(_)) => Some((&rest[..index], status)),
            _ => None,
        }
    })
}
