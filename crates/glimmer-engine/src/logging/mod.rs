//! Logging utilities.
//!
//! Centralizes logger initialization. Everything in the engine reports
//! through the standard `log` facade; compile/link/validation diagnostics
//! and driver debug messages all land here.

mod init;

pub use init::{LoggingConfig, init_logging};
