//! Wallet session: connection state, network validation and provider events.

use crate::config::NetworkConfig;
use crate::errors::connect_message;
use crate::network::{current_chain_id, ensure_network, NetworkOutcome};
use crate::notify::{Notifier, Toast};
use crate::provider::{ListenerId, ProviderEvent, Transport, WalletProvider};
use crate::rpc::parse_u256;
use crate::storage::{KeyValueStore, DISCONNECT_FLAG_KEY};
use alloy_primitives::utils::format_units;
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Observable session state. Empty strings mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub account: String,
    pub current_network: String,
    pub is_connecting: bool,
    pub balance: String,
    pub is_loading_balance: bool,
    pub is_connected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(String),
    Failed,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected(_))
    }
}

pub use crate::models::format_address;

pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    reader: Arc<dyn Transport>,
    network: NetworkConfig,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    state: WalletState,
    subscription: Option<(ListenerId, UnboundedReceiver<ProviderEvent>)>,
}

impl WalletSession {
    /// `reader` serves balance lookups; it may be the wallet itself.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn Transport>,
        network: NetworkConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            reader,
            network,
            store,
            notifier,
            state: WalletState::default(),
            subscription: None,
        }
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    pub fn account(&self) -> Option<&str> {
        Some(self.state.account.as_str()).filter(|a| !a.is_empty())
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.provider.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn connect(&mut self) -> ConnectOutcome {
        let Some(provider) = self.provider.clone() else {
            self.notifier.notify(Toast::error(
                "Wallet not found",
                "Please install MetaMask or another Web3 wallet",
            ));
            return ConnectOutcome::Failed;
        };

        match current_chain_id(provider.as_ref()).await {
            Ok(id) if id != self.network.chain_id => {
                self.notifier.notify(Toast::error(
                    "Wrong Network",
                    format!("Please switch to {} to use this dApp", self.network.name),
                ));
            }
            Ok(_) => {}
            Err(e) => log::warn!("⚠️ Chain id pre-check failed: {e}"),
        }

        self.state.is_connecting = true;
        let result = self.connect_inner(provider.as_ref()).await;
        self.state.is_connecting = false;

        match result {
            Ok(address) => {
                log::info!("🔗 Wallet connected: {}", format_address(&address));
                self.notifier.notify(Toast::info(
                    "Wallet connected",
                    format!("Successfully connected to {}", self.network.name),
                ));
                ConnectOutcome::Connected(address)
            }
            Err(e) => {
                log::error!("❌ Connection error: {e:#}");
                self.notifier.notify(Toast::error(
                    "Connection failed",
                    connect_message(&e, "Failed to connect wallet"),
                ));
                ConnectOutcome::Failed
            }
        }
    }

    async fn connect_inner(&mut self, provider: &dyn WalletProvider) -> Result<String> {
        self.check_network().await;
        provider.request("eth_requestAccounts", json!([])).await?;

        match ensure_network(provider, &self.network).await? {
            NetworkOutcome::AlreadyActive => {}
            NetworkOutcome::Switched => self.notifier.notify(Toast::info(
                "Network switched",
                format!("Successfully switched to {}", self.network.name),
            )),
            NetworkOutcome::Added => self.notifier.notify(Toast::info(
                "Network added",
                format!("Added and switched to {}", self.network.name),
            )),
        }

        let accounts = provider.request("eth_accounts", json!([])).await?;
        let address = first_account(&accounts)
            .ok_or_else(|| anyhow!("Wallet returned no accounts"))?;

        self.state.account = address.clone();
        self.state.is_connected = true;
        self.fetch_balance(&address).await;
        self.check_network().await;
        self.store.remove(DISCONNECT_FLAG_KEY);
        Ok(address)
    }

    pub async fn disconnect(&mut self) {
        if let Some(provider) = &self.provider {
            if let Err(e) = provider
                .request("wallet_revokePermissions", json!([{ "eth_accounts": {} }]))
                .await
            {
                log::info!("Failed to revoke permissions: {e}");
            }
        }

        self.store.set(DISCONNECT_FLAG_KEY, "true");
        self.state.account.clear();
        self.state.current_network.clear();
        self.state.balance.clear();
        self.state.is_connected = false;

        log::info!("👋 Wallet disconnected");
        self.notifier.notify(Toast::info(
            "Wallet disconnected",
            "Your wallet has been disconnected",
        ));
    }

    /// Rehydrate an existing authorization and start listening for events.
    pub async fn mount(&mut self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };

        if self.subscription.is_none() {
            let (tx, rx) = mpsc::unbounded_channel();
            let id = provider.subscribe(tx);
            self.subscription = Some((id, rx));
        }

        if self.store.get(DISCONNECT_FLAG_KEY).as_deref() == Some("true") {
            log::debug!("Skipping auto-connect: user disconnected");
            return;
        }

        match provider.request("eth_accounts", json!([])).await {
            Ok(accounts) => {
                if let Some(address) = first_account(&accounts) {
                    log::info!("♻️ Restored session for {}", format_address(&address));
                    self.state.account = address.clone();
                    self.state.is_connected = true;
                    self.check_network().await;
                    self.fetch_balance(&address).await;
                }
            }
            Err(e) => log::error!("❌ Error checking existing connection: {e}"),
        }
    }

    pub fn unmount(&mut self) {
        if let (Some((id, _)), Some(provider)) = (self.subscription.take(), &self.provider) {
            provider.unsubscribe(id);
        }
    }

    pub async fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => {
                let address = accounts.into_iter().next().unwrap_or_default();
                self.state.is_connected = !address.is_empty();
                self.state.account = address.clone();
                if address.is_empty() {
                    self.state.current_network.clear();
                    self.state.balance.clear();
                } else {
                    self.fetch_balance(&address).await;
                }
            }
            ProviderEvent::ChainChanged(chain) => {
                log::info!("🔁 Chain changed to {chain}");
                self.check_network().await;
            }
        }
    }

    /// Handle every event already queued; returns how many were handled.
    pub async fn pump_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some((_, rx)) = self.subscription.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        let n = pending.len();
        for event in pending {
            self.handle_event(event).await;
        }
        n
    }

    /// Wait for the next provider event and handle it.
    pub async fn next_event(&mut self) -> Option<ProviderEvent> {
        let event = self.subscription.as_mut()?.1.recv().await?;
        self.handle_event(event.clone()).await;
        Some(event)
    }

    pub async fn check_network(&mut self) {
        let Some(provider) = &self.provider else {
            return;
        };
        self.state.current_network = match current_chain_id(provider.as_ref()).await {
            Ok(id) if id == self.network.chain_id => self.network.name.clone(),
            Ok(_) => format!("Wrong Network (Expected: {})", self.network.name),
            Err(e) => {
                log::warn!("⚠️ Network check failed: {e}");
                "Unknown".to_string()
            }
        };
    }

    pub async fn fetch_balance(&mut self, address: &str) {
        if address.is_empty() {
            return;
        }
        self.state.is_loading_balance = true;
        self.state.balance = match self.native_balance(address).await {
            Ok(balance) => balance,
            Err(e) => {
                log::warn!("⚠️ Balance lookup failed for {address}: {e:#}");
                "0.0000".to_string()
            }
        };
        self.state.is_loading_balance = false;
    }

    async fn native_balance(&self, address: &str) -> Result<String> {
        let raw = self
            .reader
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        let wei = parse_u256(&raw).ok_or_else(|| anyhow!("unexpected balance {raw}"))?;
        let units = format_units(wei, self.network.decimals)?;
        let value: f64 = units.parse()?;
        Ok(format!("{value:.4}"))
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn first_account(accounts: &serde_json::Value) -> Option<String> {
    accounts
        .get(0)
        .and_then(|a| a.as_str())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}
