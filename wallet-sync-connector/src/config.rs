#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// The top-level configuration for the `wallet-sync-connector` library.
///
/// This struct aggregates the ceilings and batch sizes of every stage. It is
/// typically deserialized from a configuration file by the service and passed
/// to the `SyncContext` upon initialization.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct SyncConfig {
    /// Static list of tracked addresses. Empty means "ask the node for its accounts".
    #[cfg_attr(feature = "serde", serde(default))]
    pub addresses: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub snapshot: SnapshotConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scan: ScanConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub submit: SubmitConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub token: TokenConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub schedule: ScheduleConfig,
}

/// Settings for the balance snapshot taken at the start of every round.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct SnapshotConfig {
    /// Maximum number of balance lookups in flight.
    pub concurrency: usize,
    pub toleration: usize,
    /// Whether the token balance is queried in addition to the native balance.
    pub include_token_balance: bool,
}

/// Settings for the block scan.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct ScanConfig {
    /// Maximum number of blocks fetched concurrently.
    pub block_concurrency: usize,
    /// Maximum number of receipts fetched concurrently within one block.
    pub receipt_concurrency: usize,
    pub block_toleration: usize,
    pub receipt_toleration: usize,
    /// Size of the window ending at the chain tip when no explicit range is given.
    pub lookback_blocks: u64,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    /// Log a progress line every this many blocks.
    pub progress_interval: u64,
    /// Re-order each account's history by block number after the scan.
    pub sort_by_block: bool,
}

/// Settings for delivering account histories to the ledger.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct SubmitConfig {
    /// Maximum number of transactions per submission.
    pub chunk_size: usize,
    /// Maximum number of accounts submitting at the same time.
    pub address_concurrency: usize,
    /// Extra attempts for a rejected chunk before the account is aborted.
    pub chunk_toleration: usize,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct TokenConfig {
    /// Decimals of the tracked token, used to scale transfer amounts.
    pub decimals: u32,
}

/// Controls how often the orchestrator repeats a round.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct ScheduleConfig {
    /// Pause between rounds. `None` runs a single round.
    pub interval_secs: Option<u64>,
    /// Stop after this many rounds. `None` means until shutdown.
    pub max_rounds: Option<u64>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            toleration: 0,
            include_token_balance: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_concurrency: 30,
            receipt_concurrency: 10,
            block_toleration: 0,
            receipt_toleration: 0,
            lookback_blocks: 300,
            start_block: None,
            end_block: None,
            progress_interval: 50,
            sort_by_block: true,
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            address_concurrency: 2,
            chunk_toleration: 0,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { decimals: 18 }
    }
}

impl SyncConfig {
    /// Rejects settings that would stall or misbehave at runtime.
    pub fn validate(&self) -> Result<(), SyncError> {
        let ceilings = [
            ("snapshot.concurrency", self.snapshot.concurrency),
            ("scan.block-concurrency", self.scan.block_concurrency),
            ("scan.receipt-concurrency", self.scan.receipt_concurrency),
            ("submit.address-concurrency", self.submit.address_concurrency),
            ("submit.chunk-size", self.submit.chunk_size),
        ];
        if let Some((name, _)) = ceilings.iter().find(|(_, value)| *value == 0) {
            return Err(SyncError::InvalidConfig(format!("{} must be at least 1", name)));
        }
        if let (Some(start), Some(end)) = (self.scan.start_block, self.scan.end_block) {
            if start > end {
                return Err(SyncError::InvalidConfig(format!(
                    "scan.start-block ({}) is after scan.end-block ({})",
                    start, end
                )));
            }
        }
        if self.schedule.interval_secs == Some(0) {
            return Err(SyncError::InvalidConfig(
                "schedule.interval-secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
