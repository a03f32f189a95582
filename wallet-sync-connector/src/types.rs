//! Domain records shared by every stage of a synchronization round.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bigdecimal::BigDecimal;
use std::{collections::BTreeMap, fmt, str::FromStr};

/// A tracked wallet address.
///
/// Addresses compare case-insensitively: the inner value is always stored lowercased,
/// whether it came from a checksummed or a lowercase spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            anyhow::bail!("address must not be empty");
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single matched transaction, as delivered to the ledger.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TransactionRecord {
    pub block_number: u64,
    pub tx_id: String,
    pub from_address: Address,
    pub to_address: Option<Address>,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub native_amount_transferred: BigDecimal,
    /// Zero when the transaction input is not a token `transfer` call.
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub token_amount_transferred: BigDecimal,
}

/// Balances and accumulated history of one tracked address.
///
/// Created by the snapshot stage with an empty history, appended to by the
/// scan stage, and read by the submitter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AccountRecord {
    pub address: Address,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub native_balance: BigDecimal,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub token_balance: BigDecimal,
    pub transactions: Vec<TransactionRecord>,
}

impl AccountRecord {
    pub fn new(address: Address, native_balance: BigDecimal, token_balance: BigDecimal) -> Self {
        Self {
            address,
            native_balance,
            token_balance,
            transactions: Vec::new(),
        }
    }

    /// Splits the history into contiguous chunks of at most `chunk_size` records.
    ///
    /// An account without history still yields one empty chunk so its balances
    /// reach the ledger.
    pub fn chunks(&self, chunk_size: usize) -> Vec<AccountChunk> {
        let chunk_size = chunk_size.max(1);
        if self.transactions.is_empty() {
            return vec![self.chunk_at(0, &[])];
        }
        self.transactions
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, slice)| self.chunk_at(index * chunk_size, slice))
            .collect()
    }

    fn chunk_at(&self, offset: usize, transactions: &[TransactionRecord]) -> AccountChunk {
        AccountChunk {
            address: self.address.clone(),
            native_balance: self.native_balance.clone(),
            token_balance: self.token_balance.clone(),
            offset,
            transactions: transactions.to_vec(),
        }
    }
}

/// All account records of a round, keyed and ordered by address.
pub type AccountBook = BTreeMap<Address, AccountRecord>;

/// The body of one ledger submission: an account's balances plus one slice of its history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AccountChunk {
    pub address: Address,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub native_balance: BigDecimal,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub token_balance: BigDecimal,
    /// Index of the first transaction of this chunk within the account's history.
    pub offset: usize,
    pub transactions: Vec<TransactionRecord>,
}

impl AccountChunk {
    /// Half-open `[start, end)` range of history covered by this chunk.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.transactions.len()
    }
}

/// Native balance of one address, as reported by the balance job.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BalanceEntry {
    pub address: Address,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub amount: BigDecimal,
}

/// Body of the balance job submission.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BalanceReport {
    pub balances: Vec<BalanceEntry>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::amount::plain_notation::serialize"))]
    pub total: BigDecimal,
}
