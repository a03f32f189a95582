//! # Synchronization Stages
//!
//! Each stage of a round is a small struct built from a shared [`SyncContext`]:
//!
//! - [`AccountSnapshotStage`]: balances of every tracked address, producing the account book.
//! - [`BlockScanStage`]: walks a block range and appends matched transactions to the book.
//! - [`ChunkedSubmitter`]: delivers each account's history to the ledger in ordered chunks.
//! - [`BalanceReporter`]: the balance-only job, independent of the other three.
//!
//! Stages do not know about each other; [`crate::orchestrator::SyncOrchestrator`] sequences them.

mod balances;
mod scan;
mod snapshot;
mod submit;

pub use balances::BalanceReporter;
pub use scan::{BlockScanStage, ScanOutcome};
pub use snapshot::{AccountSnapshotStage, SnapshotOutcome};
pub use submit::{AddressSubmission, ChunkedSubmitter, SubmitOutcome};

use crate::{
    client::{ChainClient, LedgerSink},
    config::SyncConfig,
};
use std::sync::Arc;

/// A shared context containing all dependencies required by the stages of a run.
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<SyncConfig>,
    pub chain: Arc<dyn ChainClient>,
    pub ledger: Arc<dyn LedgerSink>,
}

impl SyncContext {
    pub fn new(
        config: Arc<SyncConfig>,
        chain: Arc<dyn ChainClient>,
        ledger: Arc<dyn LedgerSink>,
    ) -> Self {
        Self {
            config,
            chain,
            ledger,
        }
    }
}
