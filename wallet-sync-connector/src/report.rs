use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Summary of one synchronization round.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct SyncReport {
    pub round: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub blocks: RangeInclusive<u64>,
    /// Addresses that entered the round.
    pub addresses: usize,
    pub snapshot_failures: usize,
    pub blocks_scanned: usize,
    pub blocks_missing: usize,
    pub blocks_failed: usize,
    pub receipts_failed: usize,
    pub attempted_transactions: usize,
    pub submitted_transactions: usize,
    pub aborted_addresses: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.submitted_transactions == self.attempted_transactions
    }

    /// Logs the summary, warning when part of the history did not reach the ledger.
    pub fn log_summary(&self) {
        tracing::info!(
            round = self.round,
            from_block = *self.blocks.start(),
            to_block = *self.blocks.end(),
            addresses = self.addresses,
            blocks_scanned = self.blocks_scanned,
            blocks_missing = self.blocks_missing,
            elapsed_ms = (self.finished_at - self.started_at).num_milliseconds(),
            "Round finished: {} of {} transactions submitted.",
            self.submitted_transactions,
            self.attempted_transactions
        );
        if !self.is_complete() {
            tracing::warn!(
                round = self.round,
                aborted = ?self.aborted_addresses,
                "Only {} of {} transactions were submitted, reconcile manually!",
                self.submitted_transactions,
                self.attempted_transactions
            );
        }
        if self.snapshot_failures + self.blocks_failed + self.receipts_failed > 0 {
            tracing::warn!(
                round = self.round,
                snapshot_failures = self.snapshot_failures,
                blocks_failed = self.blocks_failed,
                receipts_failed = self.receipts_failed,
                "Round finished with fetch failures."
            );
        }
    }
}
