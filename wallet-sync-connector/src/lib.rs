//! A core Rust library for synchronizing EVM wallet activity into a downstream ledger.
//!
//! For a set of tracked addresses the connector snapshots balances, scans a block
//! range for transactions touching those addresses, decodes token transfer payloads
//! and delivers every account's history to the ledger in ordered chunks. All remote
//! calls go through bounded queues so the node is never flooded.
//!
//! # Key Components
//!
//! *   [`queue`]: The [`BoundedQueue`](queue::BoundedQueue) and [`TaskUnit`](queue::TaskUnit)
//!     primitives used at every scheduling site.
//! *   [`stages`]: The snapshot, scan, submit and balance stages, built from a shared
//!     [`SyncContext`](stages::SyncContext).
//! *   [`orchestrator`]: [`SyncOrchestrator`](orchestrator::SyncOrchestrator), which
//!     sequences the stages and repeats rounds on a schedule.
//! *   [`client`]: The [`ChainClient`](client::ChainClient) and
//!     [`LedgerSink`](client::LedgerSink) traits the service implements.

/// Hex quantity parsing and decimal scaling.
pub mod amount;
pub mod client;
/// Defines configuration structures for the connector.
pub mod config;
/// Decoding of token `transfer` call payloads.
pub mod decoder;
pub mod error;
pub mod orchestrator;
pub mod queue;
/// The per-round summary.
pub mod report;
pub mod stages;
pub mod types;

pub use client::{ChainClient, LedgerSink, SubmitResponse};
pub use config::SyncConfig;
pub use error::SyncError;
pub use orchestrator::SyncOrchestrator;
pub use report::SyncReport;
pub use stages::SyncContext;
pub use types::{AccountBook, AccountChunk, AccountRecord, Address, TransactionRecord};
