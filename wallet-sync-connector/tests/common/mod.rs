#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use wallet_sync_connector::{
    client::{Block, BlockTransaction, Receipt},
    types::BalanceReport,
    AccountChunk, Address, ChainClient, LedgerSink, SubmitResponse, SyncConfig, SyncContext,
};

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";
pub const CAROL: &str = "0x2abe40823174787749628be669d9d9ae4da84434";
pub const OUTSIDER: &str = "0x9999999999999999999999999999999999999999";

/// `transfer(CAROL, 11111 * 10^18)`
pub const TRANSFER_PAYLOAD: &str = "0xa9059cbb0000000000000000000000002abe40823174787749628be669d9d9ae4da8443400000000000000000000000000000000000000000000025a5419af66253c0000";

/// An in-memory node. Every call is recorded by name.
///
/// Block and receipt fetches can be slowed down with `tokio::time::sleep`, which
/// lets paused-clock tests decide the order in which units finish.
#[derive(Default)]
pub struct MockChain {
    pub tip: u64,
    pub accounts: Vec<Address>,
    pub balances: HashMap<Address, BigDecimal>,
    pub blocks: HashMap<u64, Block>,
    pub receipts: HashMap<String, Receipt>,
    block_delays: HashMap<u64, Duration>,
    receipt_delay: Option<Duration>,
    receipts_in_flight: AtomicUsize,
    peak_receipts_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn with_balance(mut self, address: &str, amount: i64) -> Self {
        self.balances
            .insert(Address::new(address), BigDecimal::from(amount));
        self
    }

    /// Adds a block together with a receipt for each of its transactions.
    pub fn with_block(mut self, number: u64, transactions: Vec<BlockTransaction>) -> Self {
        for tx in &transactions {
            self.receipts.insert(
                tx.hash.clone(),
                Receipt {
                    from: tx.from.clone(),
                    to: tx.to.clone(),
                    cumulative_gas_used: 42_000,
                    gas_used: 21_000,
                    block_number: number,
                },
            );
        }
        self.blocks.insert(
            number,
            Block {
                number,
                transactions: Some(transactions),
            },
        );
        self
    }

    pub fn with_block_delay(mut self, number: u64, millis: u64) -> Self {
        self.block_delays
            .insert(number, Duration::from_millis(millis));
        self
    }

    pub fn with_receipt_delay(mut self, millis: u64) -> Self {
        self.receipt_delay = Some(Duration::from_millis(millis));
        self
    }

    /// Highest number of receipt fetches that were running at the same time.
    pub fn peak_receipts_in_flight(&self) -> usize {
        self.peak_receipts_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_block(&self, number: u64) -> Result<Option<Block>> {
        self.record("get_block");
        if let Some(delay) = self.block_delays.get(&number) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.blocks.get(&number).cloned())
    }

    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<Receipt>> {
        self.record("get_transaction_receipt");
        let running = self.receipts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_receipts_in_flight
            .fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.receipt_delay {
            tokio::time::sleep(delay).await;
        }
        self.receipts_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.receipts.get(hash).cloned())
    }

    async fn get_native_balance(&self, address: &Address) -> Result<BigDecimal> {
        self.record("get_native_balance");
        self.balances
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("unknown account {}", address))
    }

    async fn get_token_balance(&self, _address: &Address) -> Result<BigDecimal> {
        self.record("get_token_balance");
        Ok(BigDecimal::from(0))
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.record("accounts");
        Ok(self.accounts.clone())
    }

    async fn block_number(&self) -> Result<u64> {
        self.record("block_number");
        Ok(self.tip)
    }
}

/// An in-memory ledger that rejects chunks starting at configured offsets.
#[derive(Default)]
pub struct MockLedger {
    pub chunks: Mutex<Vec<AccountChunk>>,
    pub balance_reports: Mutex<Vec<BalanceReport>>,
    rejected: Vec<(Address, usize)>,
}

impl MockLedger {
    pub fn rejecting(address: &str, offset: usize) -> Self {
        Self {
            rejected: vec![(Address::new(address), offset)],
            ..Self::default()
        }
    }

    pub fn chunks_of(&self, address: &str) -> Vec<AccountChunk> {
        let address = Address::new(address);
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|chunk| chunk.address == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerSink for MockLedger {
    async fn submit_chunk(&self, chunk: &AccountChunk) -> Result<SubmitResponse> {
        self.chunks.lock().unwrap().push(chunk.clone());
        let rejected = self
            .rejected
            .iter()
            .any(|(address, offset)| *address == chunk.address && *offset == chunk.offset);
        if rejected {
            return Ok(SubmitResponse {
                code: 1,
                msg: "rejected".to_string(),
            });
        }
        Ok(SubmitResponse::ok())
    }

    async fn submit_balances(&self, report: &BalanceReport) -> Result<SubmitResponse> {
        self.balance_reports.lock().unwrap().push(report.clone());
        Ok(SubmitResponse::ok())
    }
}

pub fn transfer(hash: &str, from: &str, to: &str, input: &str) -> BlockTransaction {
    BlockTransaction {
        hash: hash.to_string(),
        from: Address::new(from),
        to: Some(Address::new(to)),
        value: BigInt::from(0),
        input: input.to_string(),
    }
}

pub fn context(config: SyncConfig, chain: Arc<MockChain>, ledger: Arc<MockLedger>) -> SyncContext {
    SyncContext::new(Arc::new(config), chain, ledger)
}
