//! Block scanning and transaction matching.
//!
//! Two levels of [`BoundedQueue`]: an outer queue with one unit per block, and
//! inside every block unit a private queue with one unit per matched transaction.
//! A block unit resolves only once its receipt queue has drained, so the outer
//! queue finishing means every matched transaction of every block was processed.

use crate::{
    amount::{scale_units, NATIVE_DECIMALS},
    client::{BlockTransaction, ChainClient},
    decoder::decode_transfer_input,
    queue::{BoundedQueue, TaskUnit},
    stages::SyncContext,
    types::{AccountBook, Address, TransactionRecord},
};
use anyhow::{anyhow, Context, Result};
use std::{collections::HashSet, ops::RangeInclusive, sync::Arc};

/// Counters of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub blocks_total: usize,
    /// Blocks fetched with a transaction list.
    pub blocks_scanned: usize,
    /// Blocks the node did not return; not an error, the tip may lag.
    pub blocks_missing: usize,
    pub blocks_failed: usize,
    pub receipts_failed: usize,
    /// Records appended to the book, counting a transaction once per matched account.
    pub records_appended: usize,
}

impl ScanOutcome {
    pub fn all_blocks_failed(&self) -> bool {
        self.blocks_total > 0 && self.blocks_failed == self.blocks_total
    }
}

/// What one block unit produced.
struct BlockResult {
    missing: bool,
    matches: Vec<(Address, TransactionRecord)>,
    receipts_failed: usize,
}

impl BlockResult {
    fn missing() -> Self {
        Self {
            missing: true,
            matches: Vec::new(),
            receipts_failed: 0,
        }
    }
}

/// Per-block settings copied into every block unit.
#[derive(Debug, Clone, Copy)]
struct BlockLimits {
    receipt_concurrency: usize,
    receipt_toleration: usize,
    progress_interval: u64,
    token_decimals: u32,
}

pub struct BlockScanStage {
    ctx: SyncContext,
}

impl BlockScanStage {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Scans `blocks` for transactions from or to any account in `book` and appends
    /// the matches to the corresponding records.
    ///
    /// Appends follow completion order; with `sort-by-block` enabled every history
    /// is stably re-ordered by block number afterwards.
    pub async fn run(&self, blocks: RangeInclusive<u64>, book: &mut AccountBook) -> ScanOutcome {
        let settings = &self.ctx.config.scan;
        let tracked: Arc<HashSet<Address>> = Arc::new(book.keys().cloned().collect());
        let limits = BlockLimits {
            receipt_concurrency: settings.receipt_concurrency,
            receipt_toleration: settings.receipt_toleration,
            progress_interval: settings.progress_interval,
            token_decimals: self.ctx.config.token.decimals,
        };

        tracing::info!(
            from_block = *blocks.start(),
            to_block = *blocks.end(),
            accounts = tracked.len(),
            "Starting block scan."
        );

        let mut queue = BoundedQueue::new(
            "blocks",
            settings.block_concurrency,
            settings.block_toleration,
        );
        for number in blocks {
            let chain = self.ctx.chain.clone();
            let tracked = tracked.clone();
            queue.add(TaskUnit::new(format!("block {}", number), move || {
                let chain = chain.clone();
                let tracked = tracked.clone();
                async move { scan_block(chain, tracked, number, limits).await }
            }));
        }

        let report = queue.consume().await;
        let mut outcome = ScanOutcome {
            blocks_total: report.total,
            blocks_failed: report.failed(),
            ..ScanOutcome::default()
        };

        for block in report.outputs {
            if block.missing {
                outcome.blocks_missing += 1;
                continue;
            }
            outcome.blocks_scanned += 1;
            outcome.receipts_failed += block.receipts_failed;
            for (address, record) in block.matches {
                if let Some(account) = book.get_mut(&address) {
                    account.transactions.push(record);
                    outcome.records_appended += 1;
                }
            }
        }

        if settings.sort_by_block {
            for account in book.values_mut() {
                account.transactions.sort_by_key(|record| record.block_number);
            }
        }

        tracing::info!(
            blocks = outcome.blocks_total,
            missing = outcome.blocks_missing,
            failed = outcome.blocks_failed,
            records = outcome.records_appended,
            "Block scan complete, all accounts matched."
        );
        outcome
    }
}

async fn scan_block(
    chain: Arc<dyn ChainClient>,
    tracked: Arc<HashSet<Address>>,
    number: u64,
    limits: BlockLimits,
) -> Result<BlockResult> {
    if limits.progress_interval > 0 && number % limits.progress_interval == 0 {
        tracing::info!(block = number, "Searching block {}", number);
    }

    let block = chain
        .get_block(number)
        .await
        .with_context(|| format!("failed to get block {}", number))?;
    let Some(transactions) = block.and_then(|block| block.transactions) else {
        tracing::debug!(block = number, "Block not available, skipping.");
        return Ok(BlockResult::missing());
    };

    let mut receipts = BoundedQueue::new(
        format!("receipts@{}", number),
        limits.receipt_concurrency,
        limits.receipt_toleration,
    );
    for transaction in transactions {
        let matched = matching_addresses(&transaction, &tracked);
        if matched.is_empty() {
            continue;
        }
        let chain = chain.clone();
        let transaction = Arc::new(transaction);
        let matched = Arc::new(matched);
        receipts.add(TaskUnit::new(transaction.hash.clone(), move || {
            let chain = chain.clone();
            let transaction = transaction.clone();
            let matched = matched.clone();
            async move {
                build_records(chain, &transaction, &matched, limits.token_decimals).await
            }
        }));
    }

    let report = receipts.consume().await;
    let receipts_failed = report.failed();
    Ok(BlockResult {
        missing: false,
        matches: report.outputs.into_iter().flatten().collect(),
        receipts_failed,
    })
}

/// Tracked accounts on either side of `transaction`, each listed once.
fn matching_addresses(transaction: &BlockTransaction, tracked: &HashSet<Address>) -> Vec<Address> {
    let mut matched = Vec::with_capacity(2);
    if tracked.contains(&transaction.from) {
        matched.push(transaction.from.clone());
    }
    if let Some(to) = &transaction.to {
        if *to != transaction.from && tracked.contains(to) {
            matched.push(to.clone());
        }
    }
    matched
}

async fn build_records(
    chain: Arc<dyn ChainClient>,
    transaction: &BlockTransaction,
    matched: &[Address],
    token_decimals: u32,
) -> Result<Vec<(Address, TransactionRecord)>> {
    let receipt = chain
        .get_transaction_receipt(&transaction.hash)
        .await
        .with_context(|| format!("failed to get receipt of {}", transaction.hash))?
        .ok_or_else(|| anyhow!("receipt of {} is not available", transaction.hash))?;

    let record = TransactionRecord {
        block_number: receipt.block_number,
        tx_id: transaction.hash.clone(),
        from_address: receipt.from,
        to_address: receipt.to,
        cumulative_gas_used: receipt.cumulative_gas_used,
        gas_used: receipt.gas_used,
        native_amount_transferred: scale_units(transaction.value.clone(), NATIVE_DECIMALS),
        token_amount_transferred: decode_transfer_input(&transaction.input, token_decimals)
            .token_amount(),
    };

    Ok(matched
        .iter()
        .map(|address| (address.clone(), record.clone()))
        .collect())
}
