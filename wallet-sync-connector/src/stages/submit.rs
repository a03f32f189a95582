use crate::{
    client::LedgerSink,
    queue::{BoundedQueue, QueueReport, TaskUnit},
    stages::SyncContext,
    types::{AccountBook, AccountRecord, Address},
};
use std::sync::Arc;

/// Delivery result of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSubmission {
    pub address: Address,
    /// Transactions in the account's history.
    pub attempted: usize,
    /// Transactions the ledger accepted.
    pub submitted: usize,
    pub chunks_total: usize,
    pub chunks_submitted: usize,
    /// Set when a chunk was rejected and the rest of the history was skipped.
    pub aborted: bool,
}

/// Delivery results of all accounts, in completion order.
#[derive(Debug, Clone, Default)]
pub struct SubmitOutcome {
    pub accounts: Vec<AddressSubmission>,
}

impl SubmitOutcome {
    pub fn attempted(&self) -> usize {
        self.accounts.iter().map(|a| a.attempted).sum()
    }

    pub fn submitted(&self) -> usize {
        self.accounts.iter().map(|a| a.submitted).sum()
    }

    pub fn aborted_addresses(&self) -> Vec<String> {
        self.accounts
            .iter()
            .filter(|a| a.aborted)
            .map(|a| a.address.to_string())
            .collect()
    }
}

/// Delivers account histories to the ledger in ordered, bounded chunks.
///
/// Chunks of one account go out strictly one after another; different accounts
/// are submitted concurrently up to `submit.address-concurrency`.
pub struct ChunkedSubmitter {
    ctx: SyncContext,
}

impl ChunkedSubmitter {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, book: AccountBook) -> SubmitOutcome {
        let settings = &self.ctx.config.submit;
        let chunk_size = settings.chunk_size;
        let chunk_toleration = settings.chunk_toleration;

        tracing::info!(accounts = book.len(), "Submitting account histories.");

        // Account units never fail; a rejected chunk is reported in the unit's output.
        let mut queue = BoundedQueue::new("submit", settings.address_concurrency, 0).on_finished(
            |report: &QueueReport<AddressSubmission>| {
                let aborted = report.outputs.iter().filter(|a| a.aborted).count();
                tracing::info!(
                    accounts = report.succeeded(),
                    aborted,
                    "All account submissions settled."
                );
            },
        );

        for (address, record) in book {
            let ledger = self.ctx.ledger.clone();
            let record = Arc::new(record);
            queue.add(TaskUnit::new(address.to_string(), move || {
                let ledger = ledger.clone();
                let record = record.clone();
                async move {
                    Ok(submit_account(ledger, &record, chunk_size, chunk_toleration).await)
                }
            }));
        }

        let report = queue.consume().await;
        SubmitOutcome {
            accounts: report.outputs,
        }
    }
}

/// Submits the chunks of one account in order, stopping at the first rejected chunk.
async fn submit_account(
    ledger: Arc<dyn LedgerSink>,
    record: &AccountRecord,
    chunk_size: usize,
    chunk_toleration: usize,
) -> AddressSubmission {
    let chunks = record.chunks(chunk_size);
    let mut progress = AddressSubmission {
        address: record.address.clone(),
        attempted: record.transactions.len(),
        submitted: 0,
        chunks_total: chunks.len(),
        chunks_submitted: 0,
        aborted: false,
    };

    for chunk in chunks {
        let range = chunk.range();
        let count = chunk.transactions.len();
        tracing::info!(
            address = %record.address,
            from = range.start,
            to = range.end,
            "Submitting {} transactions.",
            count
        );

        let chunk = Arc::new(chunk);
        let ledger = ledger.clone();
        let mut unit = TaskUnit::new(
            format!("{} [{}..{})", record.address, range.start, range.end),
            move || {
                let ledger = ledger.clone();
                let chunk = chunk.clone();
                async move { ledger.submit_chunk(&chunk).await?.into_result() }
            },
        )
        .with_retries(chunk_toleration);

        match unit.settle().await {
            Ok(()) => {
                progress.submitted += count;
                progress.chunks_submitted += 1;
            }
            Err(error) => {
                tracing::error!(
                    address = %record.address,
                    from = range.start,
                    to = range.end,
                    transactions = count,
                    "Chunk submission failed, skipping the rest of this account: {:#}",
                    error
                );
                progress.aborted = true;
                break;
            }
        }
    }

    progress
}
