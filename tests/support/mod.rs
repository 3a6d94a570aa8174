//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod recording_progress;
pub mod scripted_source;
pub mod socket_guard;
