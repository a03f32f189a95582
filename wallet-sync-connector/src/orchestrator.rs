//! # Round Orchestration
//!
//! [`SyncOrchestrator`] sequences the stages of one round (snapshot, scan, submit)
//! and repeats rounds on the configured schedule until a termination condition is
//! met: the round limit, one-shot mode, the shutdown signal, or a fatal error.

use crate::{
    error::SyncError,
    report::SyncReport,
    stages::{AccountSnapshotStage, BalanceReporter, BlockScanStage, ChunkedSubmitter, SyncContext},
    types::{Address, BalanceReport},
};
use anyhow::anyhow;
use chrono::Utc;
use futures::future;
use std::{collections::BTreeSet, ops::RangeInclusive};
use tokio::{
    sync::watch,
    time::{sleep, Duration},
};

pub struct SyncOrchestrator {
    ctx: SyncContext,
}

impl SyncOrchestrator {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// The tracked set of a round: the configured list, or the node's accounts
    /// when none is configured. Duplicates (in any letter case) are dropped.
    pub async fn resolve_addresses(&self) -> Result<Vec<Address>, SyncError> {
        let configured = &self.ctx.config.addresses;
        let addresses = if configured.is_empty() {
            tracing::debug!("No static address list, asking the node for its accounts.");
            self.ctx.chain.accounts().await.map_err(SyncError::Accounts)?
        } else {
            configured.iter().map(Address::new).collect()
        };

        let mut seen = BTreeSet::new();
        let unique: Vec<Address> = addresses
            .into_iter()
            .filter(|address| !address.as_str().is_empty() && seen.insert(address.clone()))
            .collect();

        if unique.is_empty() {
            return Err(SyncError::NoTrackedAddresses);
        }
        Ok(unique)
    }

    /// The inclusive block range of a round.
    ///
    /// Explicit `start-block`/`end-block` settings win; a missing end is the chain
    /// tip, and a missing start is `lookback-blocks` before the end.
    pub async fn resolve_range(&self) -> Result<RangeInclusive<u64>, SyncError> {
        let scan = &self.ctx.config.scan;
        let end = match scan.end_block {
            Some(end) => end,
            None => self
                .ctx
                .chain
                .block_number()
                .await
                .map_err(SyncError::BlockRange)?,
        };
        let start = scan
            .start_block
            .unwrap_or_else(|| end.saturating_sub(scan.lookback_blocks));

        if start > end {
            return Err(SyncError::BlockRange(anyhow!(
                "start block {} is past the end block {}",
                start,
                end
            )));
        }
        Ok(start..=end)
    }

    /// Runs one full round: snapshot, scan, submit.
    pub async fn run_round(&self, round: u64) -> Result<SyncReport, SyncError> {
        self.ctx.config.validate()?;
        let started_at = Utc::now();

        let addresses = self.resolve_addresses().await?;
        let blocks = self.resolve_range().await?;
        tracing::info!(
            round,
            addresses = addresses.len(),
            from_block = *blocks.start(),
            to_block = *blocks.end(),
            "Starting synchronization round."
        );

        let snapshot = AccountSnapshotStage::new(self.ctx.clone())
            .run(&addresses)
            .await;
        if snapshot.book.is_empty() {
            return Err(SyncError::NoAccountsResolved(addresses.len()));
        }
        let mut book = snapshot.book;

        let scan = BlockScanStage::new(self.ctx.clone())
            .run(blocks.clone(), &mut book)
            .await;
        if scan.all_blocks_failed() {
            return Err(SyncError::ScanFailed(scan.blocks_total));
        }

        let submitted = ChunkedSubmitter::new(self.ctx.clone()).run(book).await;

        let report = SyncReport {
            round,
            started_at,
            finished_at: Utc::now(),
            blocks,
            addresses: addresses.len(),
            snapshot_failures: snapshot.failed.len(),
            blocks_scanned: scan.blocks_scanned,
            blocks_missing: scan.blocks_missing,
            blocks_failed: scan.blocks_failed,
            receipts_failed: scan.receipts_failed,
            attempted_transactions: submitted.attempted(),
            submitted_transactions: submitted.submitted(),
            aborted_addresses: submitted.aborted_addresses(),
        };
        report.log_summary();
        Ok(report)
    }

    /// Runs the balance-only job once.
    pub async fn report_balances(&self) -> Result<BalanceReport, SyncError> {
        self.ctx.config.validate()?;
        let addresses = self.resolve_addresses().await?;
        BalanceReporter::new(self.ctx.clone()).run(&addresses).await
    }

    /// Repeats rounds until the schedule is exhausted, `shutdown` flips to `true`,
    /// or a round fails fatally.
    ///
    /// Non-fatal round failures are logged and the next round is scheduled as usual.
    /// Returns the reports of all completed rounds.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<SyncReport>, SyncError> {
        let schedule = self.ctx.config.schedule.clone();
        let mut reports = Vec::new();
        let mut round = 0u64;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, not starting another round.");
                break;
            }

            round += 1;
            match self.run_round(round).await {
                Ok(report) => reports.push(report),
                Err(e) if e.is_fatal() => {
                    tracing::error!(round, "Synchronization stopped: {}", e);
                    return Err(e);
                }
                Err(e) => tracing::error!(round, "Round failed: {}", e),
            }

            if schedule.max_rounds.is_some_and(|max| round >= max) {
                tracing::info!(rounds = round, "Round limit reached.");
                break;
            }
            let Some(interval) = schedule.interval_secs else {
                break;
            };

            tokio::select! {
                _ = sleep(Duration::from_secs(interval)) => {},
                _ = shutdown_requested(&mut shutdown) => {
                    tracing::info!("SyncOrchestrator: shutdown signal received, exiting.");
                    break;
                }
            }
        }

        Ok(reports)
    }
}

/// Resolves once `true` is published. Never resolves if the sender is gone without it.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        future::pending::<()>().await;
    }
}
