use crate::{
    client::ChainClient,
    queue::{BoundedQueue, TaskUnit},
    stages::SyncContext,
    types::{AccountBook, AccountRecord, Address},
};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use std::sync::Arc;

/// The book produced by a snapshot, plus the addresses that could not be read.
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub book: AccountBook,
    pub failed: Vec<String>,
}

/// Reads the starting balances of every tracked address.
pub struct AccountSnapshotStage {
    ctx: SyncContext,
}

impl AccountSnapshotStage {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Snapshots all `addresses`. An address whose lookup fails is left out of the
    /// book; the others are unaffected.
    pub async fn run(&self, addresses: &[Address]) -> SnapshotOutcome {
        let settings = &self.ctx.config.snapshot;
        let include_token = settings.include_token_balance;
        let mut queue = BoundedQueue::new("snapshot", settings.concurrency, settings.toleration);

        for address in addresses {
            let chain = self.ctx.chain.clone();
            let address = address.clone();
            queue.add(TaskUnit::new(address.to_string(), move || {
                let chain = chain.clone();
                let address = address.clone();
                async move { snapshot_account(chain, address, include_token).await }
            }));
        }

        let report = queue.consume().await;
        let failed: Vec<String> = report.failures.into_iter().map(|f| f.label).collect();
        let book: AccountBook = report
            .outputs
            .into_iter()
            .map(|record| (record.address.clone(), record))
            .collect();

        tracing::info!(
            accounts = book.len(),
            failed = failed.len(),
            "Account snapshot complete."
        );
        SnapshotOutcome { book, failed }
    }
}

async fn snapshot_account(
    chain: Arc<dyn ChainClient>,
    address: Address,
    include_token: bool,
) -> Result<AccountRecord> {
    let native_balance = chain
        .get_native_balance(&address)
        .await
        .with_context(|| format!("failed to get native balance of {}", address))?;

    let token_balance = if include_token {
        chain
            .get_token_balance(&address)
            .await
            .with_context(|| format!("failed to get token balance of {}", address))?
    } else {
        BigDecimal::from(0)
    };

    Ok(AccountRecord::new(address, native_balance, token_balance))
}
