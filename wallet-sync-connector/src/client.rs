//! # Collaborator Interfaces
//!
//! The connector never talks to a node or to the ledger directly. It consumes two
//! traits, [`ChainClient`] and [`LedgerSink`], so the same pipeline runs against a
//! JSON-RPC node in production and against in-memory fakes in tests.
//!
//! Implementations are expected to be cheap to share (`Arc<dyn ChainClient>`) and
//! to carry their own request timeouts; the connector does not time out calls.

use crate::types::{AccountChunk, Address, BalanceReport};
use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A transaction as it appears in a block fetched with full bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTransaction {
    pub hash: String,
    pub from: Address,
    /// `None` for contract creations.
    pub to: Option<Address>,
    /// Transferred native amount in the smallest unit (wei).
    pub value: BigInt,
    /// Hex-encoded call payload.
    pub input: String,
}

/// A block with its transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub number: u64,
    /// `None` when the node returned the header without a transaction list.
    pub transactions: Option<Vec<BlockTransaction>>,
}

/// The subset of a transaction receipt the ledger needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub from: Address,
    pub to: Option<Address>,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub block_number: u64,
}

/// Read access to the chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetches a block with full transaction bodies. `Ok(None)` if the node does not have it (yet).
    async fn get_block(&self, number: u64) -> Result<Option<Block>>;

    /// Fetches a receipt. `Ok(None)` if the transaction is not mined.
    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<Receipt>>;

    /// Native balance, already scaled to whole coins.
    async fn get_native_balance(&self, address: &Address) -> Result<BigDecimal>;

    /// Token balance, already scaled by the token's decimals.
    async fn get_token_balance(&self, address: &Address) -> Result<BigDecimal>;

    /// Accounts managed by the node, used when no static address list is configured.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Current chain tip.
    async fn block_number(&self) -> Result<u64>;
}

/// The downstream service's reply to a submission. `code == 0` means accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubmitResponse {
    pub code: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub msg: String,
}

impl SubmitResponse {
    pub fn ok() -> Self {
        Self {
            code: 0,
            msg: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Turns a rejected submission into an error carrying the service's message.
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "ledger rejected submission (code {}): {}",
                self.code,
                self.msg
            ))
        }
    }
}

/// Write access to the downstream ledger service.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Delivers one chunk of an account's history.
    async fn submit_chunk(&self, chunk: &AccountChunk) -> Result<SubmitResponse>;

    /// Delivers the result of a balance-only run.
    async fn submit_balances(&self, report: &BalanceReport) -> Result<SubmitResponse>;
}
