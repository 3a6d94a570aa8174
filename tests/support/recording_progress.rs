//! Progress sink that remembers what each row saw.

use std::sync::{Arc, Mutex};

use harvester_core::{ProgressRow, ProgressSink, RowOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRow {
    pub row: usize,
    pub label: String,
    pub total: u64,
    pub bytes: u64,
    pub outcome: Option<RowOutcome>,
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    rows: Arc<Mutex<Vec<RecordedRow>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<RecordedRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row_for(&self, label: &str) -> Option<RecordedRow> {
        self.rows().into_iter().find(|row| row.label == label)
    }
}

struct Row {
    index: usize,
    rows: Arc<Mutex<Vec<RecordedRow>>>,
}

impl Row {
    fn with_row(&self, f: impl FnOnce(&mut RecordedRow)) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.row == self.index) {
            f(row);
        }
    }
}

impl ProgressRow for Row {
    fn advance(&mut self, delta: u64) {
        self.with_row(|row| row.bytes += delta);
    }

    fn close(&mut self, outcome: RowOutcome) {
        self.with_row(|row| row.outcome = Some(outcome));
    }
}

impl ProgressSink for RecordingProgress {
    fn create_row(&self, row: usize, total: u64, label: &str) -> Box<dyn ProgressRow> {
        self.rows.lock().unwrap().push(RecordedRow {
            row,
            label: label.to_string(),
            total,
            bytes: 0,
            outcome: None,
        });
        Box::new(Row {
            index: row,
            rows: Arc::clone(&self.rows),
        })
    }
}
