//! Logging setup.
//!
//! The library itself only talks to the `log` facade; this module installs an
//! `env_logger` backend for binaries and tests that want output.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
