//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::{ContentFilter, DEFAULT_CONCURRENCY, DEFAULT_LIMIT, DEFAULT_OUTPUT_DIR};

/// Download channel media in resumable batches.
///
/// Every item's state is tracked in a plain-text ledger next to the
/// downloads, so an interrupted run picks up where it stopped.
#[derive(Parser, Debug, Clone)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Manifest listing channels and their media (local path or http(s) URL)
    #[arg(short = 'm', long, value_name = "PATH|URL")]
    pub manifest: String,

    /// Channel to download from (required when the manifest lists several)
    #[arg(long, value_name = "ID", allow_negative_numbers = true)]
    pub channel: Option<i64>,

    /// Print the manifest's channels and exit
    #[arg(long)]
    pub list_channels: bool,

    /// Content type to download: images, videos, pdfs, zips or all
    #[arg(short = 'f', long, default_value_t = ContentFilter::All)]
    pub filter: ContentFilter,

    /// Downloads per batch (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Root directory for downloads and ledger files
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Maximum number of matching messages to process
    #[arg(long, default_value_t = DEFAULT_LIMIT as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["harvester", "--manifest", "m.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.manifest, "m.json");
        assert_eq!(args.channel, None);
        assert_eq!(args.filter, ContentFilter::All);
        assert_eq!(args.concurrency, 5); // DEFAULT_CONCURRENCY
        assert_eq!(args.output_dir, PathBuf::from("downloads"));
        assert_eq!(args.limit, 2000);
        assert!(!args.no_progress);
        assert!(!args.list_channels);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_manifest_is_required() {
        let err = Args::try_parse_from(["harvester"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(parse(&["-v"]).unwrap().verbose, 1);
        assert_eq!(parse(&["-vv"]).unwrap().verbose, 2);
        assert_eq!(parse(&["--verbose", "--verbose"]).unwrap().verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        assert!(parse(&["-q"]).unwrap().quiet);
        assert!(parse(&["--quiet"]).unwrap().quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["harvester", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = parse(&["--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_filter_values() {
        assert_eq!(parse(&["-f", "images"]).unwrap().filter, ContentFilter::Images);
        assert_eq!(parse(&["--filter", "pdfs"]).unwrap().filter, ContentFilter::Pdfs);
        assert_eq!(parse(&["-f", "zips"]).unwrap().filter, ContentFilter::Zips);
        assert_eq!(parse(&["-f", "videos"]).unwrap().filter, ContentFilter::Videos);
    }

    #[test]
    fn test_cli_unknown_filter_rejected() {
        let err = parse(&["-f", "audio"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert_eq!(parse(&["-c", "1"]).unwrap().concurrency, 1);
        assert_eq!(parse(&["--concurrency", "100"]).unwrap().concurrency, 100);
        assert_eq!(
            parse(&["-c", "0"]).unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["-c", "101"]).unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_limit_zero_rejected() {
        let err = parse(&["--limit", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_channel_and_output_dir() {
        let args = parse(&["--channel", "-100123", "-o", "/tmp/media"]).unwrap();
        assert_eq!(args.channel, Some(-100_123));
        assert_eq!(args.output_dir, PathBuf::from("/tmp/media"));
    }
}
