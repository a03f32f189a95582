//! A JSON-RPC 2.0 implementation of [`ChainClient`] for EVM nodes.

use crate::{config::NodeConfig, error::ClientError};
use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use wallet_sync_connector::{
    amount::{parse_hex_quantity, parse_hex_u64, scale_units, NATIVE_DECIMALS},
    client::{Block, BlockTransaction, ChainClient, Receipt},
    Address,
};

/// Selector of `balanceOf(address)`.
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: Option<String>,
    transactions: Option<Vec<RpcTransaction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
    #[serde(default)]
    input: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    from: String,
    to: Option<String>,
    cumulative_gas_used: String,
    gas_used: String,
    block_number: String,
}

pub struct EthRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    token_contract: Option<String>,
    token_decimals: u32,
    request_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(config: &NodeConfig, token_decimals: u32) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            rpc_url: config.rpc_url.clone(),
            token_contract: config.token_contract.clone(),
            token_decimals,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };
        tracing::trace!(method, id = request.id, "RPC request.");

        let response: JsonRpcResponse = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(response.result)
            .map_err(|e| ClientError::malformed(method, e.to_string()))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<BigInt, ClientError> {
        let raw: String = self.call(method, params).await?;
        parse_hex_quantity(&raw)
            .ok_or_else(|| ClientError::malformed(method, format!("'{}' is not a hex quantity", raw)))
    }
}

#[async_trait]
impl ChainClient for EthRpcClient {
    async fn get_block(&self, number: u64) -> Result<Option<Block>> {
        let method = "eth_getBlockByNumber";
        let block: Option<RpcBlock> = self
            .call(method, json!([format!("0x{:x}", number), true]))
            .await?;
        block
            .map(|block| convert_block(block, number))
            .transpose()
            .map_err(Into::into)
    }

    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<Receipt>> {
        let receipt: Option<RpcReceipt> = self.call("eth_getTransactionReceipt", json!([hash])).await?;
        receipt.map(convert_receipt).transpose().map_err(Into::into)
    }

    async fn get_native_balance(&self, address: &Address) -> Result<BigDecimal> {
        let wei = self
            .quantity("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Ok(scale_units(wei, NATIVE_DECIMALS))
    }

    async fn get_token_balance(&self, address: &Address) -> Result<BigDecimal> {
        let Some(contract) = self.token_contract.as_deref() else {
            return Ok(BigDecimal::from(0));
        };
        let call = json!({ "to": contract, "data": balance_of_call_data(address) });
        let units = self.quantity("eth_call", json!([call, "latest"])).await?;
        Ok(scale_units(units, self.token_decimals))
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<String> = self.call("eth_accounts", json!([])).await?;
        Ok(accounts.iter().map(Address::new).collect())
    }

    async fn block_number(&self) -> Result<u64> {
        let method = "eth_blockNumber";
        let raw: String = self.call(method, json!([])).await?;
        parse_hex_u64(&raw).ok_or_else(|| {
            ClientError::malformed(method, format!("'{}' is not a block number", raw)).into()
        })
    }
}

/// `balanceOf(address)` call data: selector followed by the address left-padded to 32 bytes.
fn balance_of_call_data(address: &Address) -> String {
    let hex = address.as_str().trim_start_matches("0x");
    format!("{}{:0>64}", BALANCE_OF_SELECTOR, hex)
}

fn hex_u64(method: &str, field: &str, raw: &str) -> Result<u64, ClientError> {
    parse_hex_u64(raw)
        .ok_or_else(|| ClientError::malformed(method, format!("{} '{}' is not a hex quantity", field, raw)))
}

fn convert_block(block: RpcBlock, requested: u64) -> Result<Block, ClientError> {
    let method = "eth_getBlockByNumber";
    let number = match block.number.as_deref() {
        Some(raw) => hex_u64(method, "number", raw)?,
        None => requested,
    };
    let transactions = block
        .transactions
        .map(|transactions| {
            transactions
                .into_iter()
                .map(|tx| {
                    let value = parse_hex_quantity(&tx.value).ok_or_else(|| {
                        ClientError::malformed(method, format!("value '{}' is not a hex quantity", tx.value))
                    })?;
                    Ok::<_, ClientError>(BlockTransaction {
                        hash: tx.hash,
                        from: Address::new(tx.from),
                        to: tx.to.map(Address::new),
                        value,
                        input: tx.input,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok(Block {
        number,
        transactions,
    })
}

fn convert_receipt(receipt: RpcReceipt) -> Result<Receipt, ClientError> {
    let method = "eth_getTransactionReceipt";
    Ok(Receipt {
        from: Address::new(receipt.from),
        to: receipt.to.map(Address::new),
        cumulative_gas_used: hex_u64(method, "cumulativeGasUsed", &receipt.cumulative_gas_used)?,
        gas_used: hex_u64(method, "gasUsed", &receipt.gas_used)?,
        block_number: hex_u64(method, "blockNumber", &receipt.block_number)?,
    })
}
