//! Binary-side wiring: config merging and terminal progress.

pub(crate) mod config_runtime;
pub(crate) mod progress_manager;
