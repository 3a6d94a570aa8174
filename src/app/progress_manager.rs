//! Terminal progress bars for download runs.
//!
//! One bar per download task, stacked in a [`MultiProgress`]. Bars are only
//! ever appended, so a finished row stays where it was. Log lines written
//! through [`BarAwareWriter`] are printed above the bars instead of through
//! them.

use std::io::{self, Write};
use std::sync::Arc;

use harvester_core::{ProgressRegistry, ProgressRow, ProgressSink, RowOutcome};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} - {msg}";
const FINISHED_TEMPLATE: &str = "  [{bar:40.green/white}] {bytes}/{total_bytes} - {msg}";

/// Progress sink rendering indicatif bars on stderr.
pub(crate) struct BarProgress {
    multi: MultiProgress,
}

impl BarProgress {
    pub(crate) fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

/// Creates the bar area shared by the progress sink and the log writer.
pub(crate) fn stderr_bars() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
}

/// Stderr writer that hides the bars while a log line is written.
#[derive(Clone)]
pub(crate) struct BarAwareWriter {
    multi: MultiProgress,
}

impl BarAwareWriter {
    pub(crate) fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Write for BarAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for BarAwareWriter {
    type Writer = BarAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct BarRow {
    bar: ProgressBar,
    label: String,
}

impl ProgressRow for BarRow {
    fn advance(&mut self, delta: u64) {
        self.bar.inc(delta);
    }

    fn close(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Finished => {
                if let Ok(style) = ProgressStyle::with_template(FINISHED_TEMPLATE) {
                    self.bar.set_style(style.progress_chars("=> "));
                }
                self.bar.finish_with_message(self.label.clone());
            }
            RowOutcome::Failed => self.bar.abandon_with_message(format!("{} (failed)", self.label)),
            RowOutcome::Abandoned => self.bar.abandon(),
        }
    }
}

impl ProgressSink for BarProgress {
    fn create_row(&self, _row: usize, total: u64, label: &str) -> Box<dyn ProgressRow> {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .map(|style| style.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(label.to_string());
        Box::new(BarRow {
            bar,
            label: label.to_string(),
        })
    }
}

/// Builds the registry for a run: bars when enabled, nothing otherwise.
pub(crate) fn progress_registry(multi: &MultiProgress, show_bars: bool) -> Arc<ProgressRegistry> {
    if show_bars {
        Arc::new(ProgressRegistry::new(Arc::new(BarProgress::new(multi.clone()))))
    } else {
        Arc::new(ProgressRegistry::hidden())
    }
}

/// Bars only make sense on an interactive, non-dumb stderr.
pub(crate) fn should_show_bars(
    stderr_is_terminal: bool,
    quiet: bool,
    no_progress: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !no_progress && !dumb_terminal
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_show_bars_requires_interactive_stderr() {
        assert!(should_show_bars(true, false, false, false));
        assert!(!should_show_bars(false, false, false, false));
        assert!(!should_show_bars(true, true, false, false));
        assert!(!should_show_bars(true, false, true, false));
        assert!(!should_show_bars(true, false, false, true));
    }

    #[test]
    fn test_hidden_registry_when_bars_disabled() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let registry = progress_registry(&multi, false);
        let mut handle = registry.open(10, "x");
        handle.observe(10);
        handle.close(RowOutcome::Finished);
        assert_eq!(registry.rows_opened(), 1);
    }

    #[test]
    fn test_bar_rows_track_position() {
        let sink = BarProgress::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()));
        let registry = ProgressRegistry::new(Arc::new(sink));
        let mut handle = registry.open(100, "1_photo_1.jpg");
        handle.observe(40);
        assert_eq!(handle.position(), 40);
        handle.close(RowOutcome::Finished);
        assert_eq!(handle.position(), 100);
    }

    #[test]
    fn test_log_writer_passes_bytes_through_while_bars_are_drawn() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let registry = progress_registry(&multi, true);
        let _handle = registry.open(100, "1_photo_1.jpg");

        let mut writer = BarAwareWriter::new(multi);
        let line = b"INFO channel sync complete\n";
        assert_eq!(writer.write(line).unwrap(), line.len());
        writer.flush().unwrap();
    }
}
