//! `tracing` subscriber setup shared by the wallet-sync binaries.

pub mod logging;

pub use logging::{init, LogConfig, LogFormat, LogOutput};
