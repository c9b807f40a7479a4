//! Benchmark driver: configuration, logging and dispatch.
//!
//! ## Structure
//!
//! - [`config`] - CLI arguments and their validation (`BenchConfig`).
//! - [`runner`] - builds the selected backend and runs the phases.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod config;
pub mod runner;
pub mod telemetry;
