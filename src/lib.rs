//! Shared setup for the DocBot binaries

pub mod logging;
