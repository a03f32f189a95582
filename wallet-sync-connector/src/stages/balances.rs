use crate::{
    error::SyncError,
    queue::{BoundedQueue, QueueReport, TaskUnit},
    stages::SyncContext,
    types::{Address, BalanceEntry, BalanceReport},
};
use anyhow::Context;
use bigdecimal::BigDecimal;

/// The balance-only job: native balance of every tracked address, totalled and
/// delivered to the ledger in a single request.
pub struct BalanceReporter {
    ctx: SyncContext,
}

impl BalanceReporter {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Collects and submits the balances of `addresses`.
    ///
    /// Addresses whose lookup fails are left out of the report and the total.
    pub async fn run(&self, addresses: &[Address]) -> Result<BalanceReport, SyncError> {
        if addresses.is_empty() {
            return Err(SyncError::NoTrackedAddresses);
        }

        let settings = &self.ctx.config.snapshot;
        let mut queue = BoundedQueue::new("balances", settings.concurrency, settings.toleration)
            .on_finished(|report: &QueueReport<BalanceEntry>| {
                let total: BigDecimal = report.outputs.iter().map(|entry| &entry.amount).sum();
                tracing::info!(
                    addresses = report.succeeded(),
                    failed = report.failed(),
                    total = %total,
                    "Balance lookup complete."
                );
            });

        for address in addresses {
            let chain = self.ctx.chain.clone();
            let address = address.clone();
            queue.add(TaskUnit::new(address.to_string(), move || {
                let chain = chain.clone();
                let address = address.clone();
                async move {
                    let amount = chain
                        .get_native_balance(&address)
                        .await
                        .with_context(|| format!("failed to get native balance of {}", address))?;
                    Ok(BalanceEntry { address, amount })
                }
            }));
        }

        let mut balances = queue.consume().await.outputs;
        balances.sort_by(|a, b| a.address.cmp(&b.address));
        let total = balances.iter().map(|entry| &entry.amount).sum();
        let report = BalanceReport { balances, total };

        self.ctx
            .ledger
            .submit_balances(&report)
            .await
            .and_then(|response| response.into_result())
            .map_err(SyncError::Ledger)?;

        tracing::info!(
            addresses = report.balances.len(),
            total = %report.total,
            "Balance report submitted."
        );
        Ok(report)
    }
}
