//! HTTP implementation of [`LedgerSink`].

use crate::{config::LedgerConfig, error::ClientError};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use wallet_sync_connector::{types::BalanceReport, AccountChunk, LedgerSink, SubmitResponse};

/// Posts JSON bodies to the ledger service and reads back its `{code, msg}` reply.
pub struct HttpLedger {
    http_client: reqwest::Client,
    transactions_url: String,
    balances_url: String,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            transactions_url: config.transactions_url(),
            balances_url: config.balances_url(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<SubmitResponse, ClientError> {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LedgerSink for HttpLedger {
    async fn submit_chunk(&self, chunk: &AccountChunk) -> Result<SubmitResponse> {
        tracing::debug!(
            address = %chunk.address,
            offset = chunk.offset,
            transactions = chunk.transactions.len(),
            "Posting account chunk."
        );
        Ok(self.post(&self.transactions_url, chunk).await?)
    }

    async fn submit_balances(&self, report: &BalanceReport) -> Result<SubmitResponse> {
        tracing::debug!(addresses = report.balances.len(), "Posting balance report.");
        Ok(self.post(&self.balances_url, report).await?)
    }
}
