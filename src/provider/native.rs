//! Native wallet provider over a local JSON-RPC bridge (Frame and similar
//! wallets expose the injected-provider methods on `http://127.0.0.1:1248`).
//!
//! HTTP has no push channel, so account and chain changes are detected by a
//! background poller that diffs `eth_accounts` / `eth_chainId` snapshots.

use super::{ListenerId, Listeners, ProviderEvent, Transport, WalletProvider};
use crate::errors::ProviderError;
use crate::rpc::rpc_post;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

pub struct RpcWalletProvider {
    url: String,
    timeout_ms: u64,
    listeners: Listeners,
}

impl RpcWalletProvider {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            timeout_ms,
            listeners: Listeners::default(),
        })
    }

    /// Ping the bridge; `None` when nothing answers (no wallet present).
    pub async fn detect(url: impl Into<String>, timeout_ms: u64) -> Option<Arc<Self>> {
        let provider = Self::new(url, timeout_ms);
        match provider.request("eth_chainId", json!([])).await {
            Ok(_) => Some(provider),
            Err(e) => {
                log::info!("🔌 No wallet bridge at {}: {e}", provider.url);
                None
            }
        }
    }

    /// Spawn the change poller. It stops on its own once the provider is dropped.
    pub fn start_event_poller(self: &Arc<Self>, interval_ms: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(run_event_poller(weak, interval_ms))
    }

    async fn snapshot(&self) -> (Option<Vec<String>>, Option<String>) {
        let accounts = self
            .request("eth_accounts", json!([]))
            .await
            .ok()
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok());
        let chain = self
            .request("eth_chainId", json!([]))
            .await
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        (accounts, chain)
    }
}

async fn run_event_poller(provider: Weak<RpcWalletProvider>, interval_ms: u64) {
    let mut last_accounts: Option<Vec<String>> = None;
    let mut last_chain: Option<String> = None;
    log::debug!("🚀 Wallet event poller started ({interval_ms}ms)");

    loop {
        let Some(p) = provider.upgrade() else {
            log::debug!("🛑 Wallet provider dropped, poller exiting");
            return;
        };

        // Skip the round trip entirely while nobody is listening
        if !p.listeners.is_empty() {
            let (accounts, chain) = p.snapshot().await;

            if let Some(accounts) = accounts {
                if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                    log::info!("👛 accountsChanged: {accounts:?}");
                    p.listeners
                        .emit(&ProviderEvent::AccountsChanged(accounts.clone()));
                }
                last_accounts = Some(accounts);
            }
            if let Some(chain) = chain {
                if last_chain.as_ref().is_some_and(|prev| *prev != chain) {
                    log::info!("⛓️ chainChanged: {chain}");
                    p.listeners.emit(&ProviderEvent::ChainChanged(chain.clone()));
                }
                last_chain = Some(chain);
            }
        }

        drop(p);
        sleep(Duration::from_millis(interval_ms)).await;
    }
}

#[async_trait]
impl Transport for RpcWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        log::debug!("📡 wallet request: {method}");
        rpc_post(&self.url, method, params, self.timeout_ms).await
    }
}

impl WalletProvider for RpcWalletProvider {
    fn subscribe(&self, tx: UnboundedSender<ProviderEvent>) -> ListenerId {
        self.listeners.add(tx)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
