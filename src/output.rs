//! CLI output formatting: channel listing and run summary.

use harvester_core::{ChannelRef, SyncReport, format_channel_list};

/// Message when the channel has no media of the requested type.
pub const NO_MEDIA_MESSAGE: &str = "No media found for the selected type.";

/// Prints the numbered channel list to stdout.
pub fn print_channel_list(channels: &[ChannelRef]) {
    if channels.is_empty() {
        println!("No channels found.");
        return;
    }
    println!("Channels:");
    println!("{}", format_channel_list(channels));
}

/// Builds the end-of-run summary lines.
pub fn summary_lines(report: &SyncReport) -> Vec<String> {
    if report.is_empty() {
        return vec![NO_MEDIA_MESSAGE.to_string()];
    }
    let stats = &report.stats;
    let counts = &report.counts;
    vec![
        format!("Channel: {}", report.channel),
        format!(
            "Found {} messages with matching media ({}).",
            report.found, report.filter
        ),
        format!(
            "This run: {} downloaded, {} failed, {} skipped, {} ignored",
            stats.completed(),
            stats.failed(),
            stats.skipped(),
            stats.ignored()
        ),
        format!(
            "Ledger: {} finished, {} skipped, {} errors, {} in queue, {} downloading",
            counts.finished, counts.skipped, counts.error, counts.in_queue, counts.downloading
        ),
        format!("Files:  {}", report.dest_dir.display()),
        format!("Log:    {}", report.ledger_path.display()),
    ]
}

/// Prints the summary to stdout.
pub fn print_summary(report: &SyncReport) {
    for line in summary_lines(report) {
        println!("{line}");
    }
}
