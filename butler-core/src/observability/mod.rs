//! Logging setup for butler binaries.
//!
//! The library itself only emits `tracing` events; applications decide where
//! they go. This module wires a `tracing-subscriber` registry with an
//! `EnvFilter` and a fmt layer writing to stderr, so console output streamed
//! to stdout is never interleaved with diagnostics.
//!
//! # Configuration
//!
//! - `BUTLER_LOG_FORMAT`: `json`, `pretty` or `compact`
//! - `BUTLER_LOG_LEVEL` (falls back to `RUST_LOG`): filter directives
//! - `BUTLER_LOG_LOCATION`: `true` to include file and line
//!
//! # Example
//!
//! ```ignore
//! use butler_core::observability::{TracingConfig, init_tracing};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};
