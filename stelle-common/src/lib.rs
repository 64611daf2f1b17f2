//! Shared plumbing for the Stelle crates.
//!
//! Today this is only the [`observability`] module: one place that wires the
//! `tracing` subscriber so the server, the CLI and integration tests all log
//! the same way.
//!
//! ```rust
//! use stelle_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "stelle");
//! assert!(cfg.emit_stderr);
//! ```
pub mod observability;
