//! CLI entry point for harvester.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use harvester_core::{
    ManifestSource, MessageSource, SyncOptions, select_channel, sync_channel,
};
use tracing::{debug, info};

mod app;
mod app_config;
mod cli;
mod output;

use app::{config_runtime, progress_manager};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();
    let loaded = app_config::load_default_file_config()?;
    let args = config_runtime::apply_config_defaults(args, &cli_sources, loaded.config.as_ref())?;

    let bars = progress_manager::stderr_bars();
    init_tracing(
        config_runtime::resolve_default_log_level(&args),
        progress_manager::BarAwareWriter::new(bars.clone()),
    );
    debug!(?args, config_path = ?loaded.path, "configuration resolved");

    let source: Arc<dyn MessageSource> = Arc::new(
        ManifestSource::load(&args.manifest)
            .await
            .with_context(|| format!("Failed to load manifest '{}'", args.manifest))?,
    );
    let channels = source.list_channels().await?;

    if args.list_channels {
        output::print_channel_list(&channels);
        return Ok(());
    }

    let channel = select_channel(&channels, args.channel)?;
    info!(channel = %channel, filter = %args.filter, "Selected channel");

    let options = SyncOptions {
        output_root: args.output_dir.clone(),
        filter: args.filter,
        concurrency: usize::from(args.concurrency),
        limit: usize::try_from(args.limit).unwrap_or(usize::MAX),
    };
    let show_bars = progress_manager::should_show_bars(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress,
        progress_manager::is_dumb_terminal(),
    );
    let progress = progress_manager::progress_registry(&bars, show_bars);

    let report = sync_channel(source, &channel, &options, progress)
        .await
        .with_context(|| format!("Download run for channel {} failed", channel.id))?;

    output::print_summary(&report);
    Ok(())
}

/// Logs go to stderr, above the progress bars, so the summary on stdout stays readable.
///
/// Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
fn init_tracing(default_level: &str, writer: progress_manager::BarAwareWriter) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .try_init();
}
