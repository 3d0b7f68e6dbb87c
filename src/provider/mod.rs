//! Wallet provider abstraction.
//!
//! Models the injected-provider surface the app consumes: a single
//! `request(method, params)` entry point plus `accountsChanged` /
//! `chainChanged` notifications.
//!
//! - Native: [`RpcWalletProvider`] talks to a wallet's local JSON-RPC bridge
//!   and polls for account/chain changes.
//! - Web (`wasm32`): `InjectedProvider` wraps `window.ethereum`.

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod injected;
        pub use injected::InjectedProvider;
    } else {
        mod native;
        pub use native::RpcWalletProvider;
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Anything that answers JSON-RPC style requests.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Transport: MaybeSendSync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Notifications emitted by a wallet provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

pub type ListenerId = u64;

/// A wallet: a [`Transport`] that can also sign and emits events.
pub trait WalletProvider: Transport {
    /// Start delivering events to `tx` until [`WalletProvider::unsubscribe`].
    fn subscribe(&self, tx: UnboundedSender<ProviderEvent>) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
}

/// Listener bookkeeping shared by provider implementations.
#[derive(Default)]
pub struct Listeners {
    next: AtomicU64,
    slots: Mutex<Vec<(ListenerId, UnboundedSender<ProviderEvent>)>>,
}

impl Listeners {
    pub fn add(&self, tx: UnboundedSender<ProviderEvent>) -> ListenerId {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut slots) = self.slots.lock() {
            slots.push((id, tx));
        }
        id
    }

    pub fn remove(&self, id: ListenerId) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.retain(|(lid, _)| *lid != id);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver to every live listener, pruning closed channels.
    pub fn emit(&self, event: &ProviderEvent) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn listeners_stop_receiving_after_remove() {
        let listeners = Listeners::default();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let a = listeners.add(tx_a);
        let _b = listeners.add(tx_b);

        listeners.emit(&ProviderEvent::ChainChanged("0x1".into()));
        listeners.remove(a);
        listeners.emit(&ProviderEvent::ChainChanged("0x2".into()));

        assert_eq!(rx_a.try_recv().unwrap(), ProviderEvent::ChainChanged("0x1".into()));
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), ProviderEvent::ChainChanged("0x1".into()));
        assert_eq!(rx_b.try_recv().unwrap(), ProviderEvent::ChainChanged("0x2".into()));
    }

    #[test]
    fn closed_channels_are_pruned() {
        let listeners = Listeners::default();
        let (tx, rx) = unbounded_channel();
        listeners.add(tx);
        drop(rx);
        listeners.emit(&ProviderEvent::AccountsChanged(vec![]));
        assert!(listeners.is_empty());
    }
}
