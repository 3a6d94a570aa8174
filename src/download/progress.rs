//! Progress reporting for in-flight downloads.
//!
//! The engine talks to a [`ProgressRegistry`], which hands out one
//! [`ProgressHandle`] per download task. Rendering is delegated to a
//! [`ProgressSink`] (terminal bars in the CLI, nothing in tests or quiet mode).
//!
//! Rows are numbered in creation order and never reused within a run: a
//! finished row keeps its index and new tasks always get a fresh one.

use std::sync::{Arc, Mutex, PoisonError};

/// How a progress row ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// The transfer completed.
    Finished,
    /// The transfer failed.
    Failed,
    /// The handle was dropped without an explicit close.
    Abandoned,
}

/// One rendered progress row.
pub trait ProgressRow: Send {
    /// Adds `delta` bytes to the row.
    fn advance(&mut self, delta: u64);

    /// Ends the row.
    fn close(&mut self, outcome: RowOutcome);
}

/// Creates progress rows.
pub trait ProgressSink: Send + Sync {
    /// Creates the row at index `row` for a transfer of `total` bytes.
    fn create_row(&self, row: usize, total: u64, label: &str) -> Box<dyn ProgressRow>;
}

/// Sink that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct HiddenProgress;

struct HiddenRow;

impl ProgressRow for HiddenRow {
    fn advance(&mut self, _delta: u64) {}

    fn close(&mut self, _outcome: RowOutcome) {}
}

impl ProgressSink for HiddenProgress {
    fn create_row(&self, _row: usize, _total: u64, _label: &str) -> Box<dyn ProgressRow> {
        Box::new(HiddenRow)
    }
}

/// Assigns display rows to download tasks.
///
/// Owned by the run and shared with every task.
pub struct ProgressRegistry {
    sink: Arc<dyn ProgressSink>,
    next_row: Mutex<usize>,
}

impl std::fmt::Debug for ProgressRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressRegistry")
            .field("rows_opened", &self.rows_opened())
            .finish_non_exhaustive()
    }
}

impl ProgressRegistry {
    /// Creates a registry rendering through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            next_row: Mutex::new(0),
        }
    }

    /// Creates a registry that renders nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self::new(Arc::new(HiddenProgress))
    }

    /// Opens a new row for a transfer of `total` bytes.
    pub fn open(&self, total: u64, label: &str) -> ProgressHandle {
        // Row assignment and creation happen under one lock so rows appear in index order.
        let mut next_row = self.next_row.lock().unwrap_or_else(PoisonError::into_inner);
        let row = *next_row;
        let inner = self.sink.create_row(row, total, label);
        *next_row += 1;
        ProgressHandle {
            row,
            total,
            position: 0,
            inner,
            closed: false,
        }
    }

    /// Returns how many rows have been opened so far.
    #[must_use]
    pub fn rows_opened(&self) -> usize {
        *self.next_row.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Progress of a single transfer.
///
/// Closing is idempotent; a handle dropped without [`ProgressHandle::close`]
/// closes itself as [`RowOutcome::Abandoned`].
pub struct ProgressHandle {
    row: usize,
    total: u64,
    position: u64,
    inner: Box<dyn ProgressRow>,
    closed: bool,
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("row", &self.row)
            .field("total", &self.total)
            .field("position", &self.position)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ProgressHandle {
    /// Display row of this handle.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Bytes reported so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Adds `delta` bytes.
    pub fn advance(&mut self, delta: u64) {
        if self.closed || delta == 0 {
            return;
        }
        self.position = self.position.saturating_add(delta);
        self.inner.advance(delta);
    }

    /// Records a cumulative byte count.
    ///
    /// Sources report running totals, possibly repeated or out of order; only
    /// growth past the last known value is forwarded.
    pub fn observe(&mut self, cumulative: u64) {
        if cumulative > self.position {
            self.advance(cumulative - self.position);
        }
    }

    /// Ends the row. On success the row is topped up to its total.
    pub fn close(&mut self, outcome: RowOutcome) {
        if self.closed {
            return;
        }
        if outcome == RowOutcome::Finished {
            self.observe(self.total);
        }
        self.closed = true;
        self.inner.close(outcome);
    }

    /// Returns true once the row has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.close(RowOutcome::Abandoned);
    }
}
