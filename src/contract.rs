//! Read and write access to the disaster report contract.
//!
//! Reads go through a plain JSON-RPC transport and never need a wallet.
//! Writes go through the wallet provider and validate the network on every
//! call; nothing about the validated network is cached between writes.

use crate::abi::{self, ContractFunction};
use crate::config::{Config, NetworkConfig};
use crate::errors::ProviderError;
use crate::models::{IndexedReport, NewReport, Report, ReportImage};
use crate::network::ensure_network;
use crate::provider::{Transport, WalletProvider};
use crate::rpc::{decode_hex_data, encode_hex_data, parse_quantity, sleep_ms};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_contract_address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .map_err(|e| anyhow!("invalid contract address {address}: {e}"))
}

/// Signer-free contract client.
pub struct ReportReader {
    transport: Arc<dyn Transport>,
    address: Address,
}

impl ReportReader {
    pub fn new(transport: Arc<dyn Transport>, address: &str) -> Result<Self> {
        Ok(Self {
            transport,
            address: parse_contract_address(address)?,
        })
    }

    async fn call(&self, f: ContractFunction, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let data = f.encode_call(args)?;
        let params = json!([
            {"to": self.address.to_checksum(None), "data": encode_hex_data(&data)},
            "latest"
        ]);
        let raw = self
            .transport
            .request("eth_call", params)
            .await
            .with_context(|| format!("eth_call {}", f.name))?;
        let bytes = decode_hex_data(&raw)?;
        f.decode_output(&bytes)
    }

    pub async fn report_count(&self) -> Result<u64> {
        let values = self.call(abi::GET_REPORT_LENGTH, &[]).await?;
        let first = values
            .first()
            .ok_or_else(|| anyhow!("getDisasterReportLength returned nothing"))?;
        abi::as_u64(first)
    }

    pub async fn report(&self, index: u64) -> Result<Report> {
        let values = self.call(abi::GET_REPORT, &[abi::uint(index)]).await?;
        abi::decode_report(&values)
    }

    pub async fn report_images(&self, index: u64) -> Result<Vec<ReportImage>> {
        let values = self.call(abi::GET_IMAGES, &[abi::uint(index)]).await?;
        abi::decode_images(&values)
    }

    /// Every report, newest first.
    ///
    /// Indices are fetched one at a time so the result keeps list order;
    /// an index that fails to load is logged and skipped.
    pub async fn all_reports(&self) -> Result<Vec<IndexedReport>> {
        let count = self.report_count().await?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(count as usize);
        for index in 0..count {
            match self.report(index).await {
                Ok(report) => reports.push(IndexedReport { index, report }),
                Err(e) => log::error!("❌ Error fetching report {index}: {e:#}"),
            }
        }
        log::info!("📦 Loaded {} of {count} reports", reports.len());

        reports.reverse();
        Ok(reports)
    }
}

/// Receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Handle for a submitted transaction.
pub struct PendingTransaction {
    pub hash: String,
    provider: Arc<dyn WalletProvider>,
    poll_ms: u64,
    timeout_ms: u64,
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .finish()
    }
}

impl PendingTransaction {
    /// Poll until the transaction is mined. A reverted transaction is an error.
    pub async fn wait(&self) -> Result<TransactionReceipt> {
        let max_polls = (self.timeout_ms / self.poll_ms.max(1)).max(1);
        for attempt in 0..max_polls {
            let raw = self
                .provider
                .request("eth_getTransactionReceipt", json!([self.hash]))
                .await?;

            if !raw.is_null() {
                let receipt = parse_receipt(&self.hash, &raw);
                if !receipt.success {
                    log::warn!("💥 Transaction {} reverted", self.hash);
                    return Err(ProviderError::new(-32000, "transaction reverted")
                        .with_reason(format!("Transaction {} reverted", self.hash))
                        .into());
                }
                log::info!(
                    "✅ Transaction {} confirmed in block {:?}",
                    self.hash,
                    receipt.block_number
                );
                return Ok(receipt);
            }

            log::debug!("⏳ Waiting for {} (poll {attempt})", self.hash);
            sleep_ms(self.poll_ms).await;
        }
        bail!(
            "Timed out after {}ms waiting for transaction {}",
            self.timeout_ms,
            self.hash
        )
    }
}

fn parse_receipt(hash: &str, raw: &Value) -> TransactionReceipt {
    TransactionReceipt {
        hash: raw["transactionHash"]
            .as_str()
            .unwrap_or(hash)
            .to_string(),
        block_number: parse_quantity(&raw["blockNumber"]),
        // Pre-Byzantium receipts carry no status; treat as success
        success: parse_quantity(&raw["status"]).map_or(true, |s| s == 1),
    }
}

/// Wallet-backed contract client.
pub struct ReportWriter {
    provider: Option<Arc<dyn WalletProvider>>,
    network: NetworkConfig,
    address: Address,
    poll_ms: u64,
    timeout_ms: u64,
}

impl ReportWriter {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkConfig,
        address: &str,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            network,
            address: parse_contract_address(address)?,
            poll_ms: 1000,
            timeout_ms: 120_000,
        })
    }

    pub fn from_config(provider: Option<Arc<dyn WalletProvider>>, cfg: &Config) -> Result<Self> {
        Ok(Self::new(provider, cfg.network.clone(), &cfg.contract_address)?
            .with_receipt_timing(cfg.receipt_poll_ms, cfg.receipt_timeout_ms))
    }

    pub fn with_receipt_timing(mut self, poll_ms: u64, timeout_ms: u64) -> Self {
        self.poll_ms = poll_ms;
        self.timeout_ms = timeout_ms;
        self
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| anyhow!("No wallet provider available"))
    }

    /// Validate the network, then resolve the signing account.
    async fn signer(&self) -> Result<(Arc<dyn WalletProvider>, String)> {
        let provider = self.provider()?.clone();
        ensure_network(provider.as_ref(), &self.network).await?;

        let accounts = provider.request("eth_accounts", json!([])).await?;
        let from = accounts
            .get(0)
            .and_then(|a| a.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::new(crate::errors::UNAUTHORIZED, "No authorized wallet account")
            })?;
        Ok((provider, from))
    }

    async fn send(&self, f: ContractFunction, args: &[DynSolValue]) -> Result<PendingTransaction> {
        let data = f.encode_call(args)?;
        let (provider, from) = self.signer().await?;
        log::info!("✍️ Sending {} from {from}", f.name);

        let raw = provider
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": self.address.to_checksum(None),
                    "data": encode_hex_data(&data),
                }]),
            )
            .await
            .with_context(|| format!("sending {}", f.name))?;
        let hash = raw
            .as_str()
            .ok_or_else(|| anyhow!("wallet returned no transaction hash"))?
            .to_string();

        log::info!("📨 {} submitted: {hash}", f.name);
        Ok(PendingTransaction {
            hash,
            provider,
            poll_ms: self.poll_ms,
            timeout_ms: self.timeout_ms,
        })
    }

    pub async fn create_report(&self, report: &NewReport) -> Result<PendingTransaction> {
        self.send(abi::CREATE_REPORT, &abi::new_report_args(report))
            .await
    }

    pub async fn delete_report(&self, index: u64) -> Result<PendingTransaction> {
        self.send(abi::DELETE_REPORT, &[abi::uint(index)]).await
    }

    pub async fn add_report_image(
        &self,
        index: u64,
        image_url: &str,
        timestamp: &str,
    ) -> Result<PendingTransaction> {
        self.send(
            abi::ADD_IMAGE,
            &[abi::uint(index), abi::string(image_url), abi::string(timestamp)],
        )
        .await
    }

    pub async fn delete_report_image(
        &self,
        index: u64,
        image_index: u64,
    ) -> Result<PendingTransaction> {
        self.send(abi::DELETE_IMAGE, &[abi::uint(index), abi::uint(image_index)])
            .await
    }

    /// The wallet's current signer address, if any.
    pub async fn current_wallet_address(&self) -> Option<String> {
        let provider = self.provider.as_ref()?;
        match provider.request("eth_accounts", json!([])).await {
            Ok(v) => v.get(0).and_then(|a| a.as_str()).map(str::to_string),
            Err(e) => {
                log::error!("❌ Error getting wallet address: {e}");
                None
            }
        }
    }
}
