//! Chain-id validation and the switch / add flow.

use crate::config::NetworkConfig;
use crate::errors::{NetworkError, ProviderError};
use crate::provider::Transport;
use crate::rpc::parse_quantity;
use serde_json::{json, Value};

/// What `ensure_network` had to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkOutcome {
    AlreadyActive,
    Switched,
    Added,
}

pub async fn current_chain_id<T: Transport + ?Sized>(provider: &T) -> Result<u64, ProviderError> {
    let raw = provider.request("eth_chainId", json!([])).await?;
    parse_quantity(&raw)
        .ok_or_else(|| ProviderError::internal(format!("unexpected chain id {raw}")))
}

/// `wallet_addEthereumChain` parameters for `net`.
pub fn add_chain_params(net: &NetworkConfig) -> Value {
    json!([{
        "chainId": net.chain_id_hex(),
        "chainName": net.name,
        "nativeCurrency": {
            "name": net.ticker,
            "symbol": net.ticker,
            "decimals": net.decimals,
        },
        "rpcUrls": [net.rpc_url],
        "blockExplorerUrls": [net.explorer_url],
    }])
}

/// Ask the wallet to switch to `net`, adding the chain on 4902.
pub async fn switch_to_network<T: Transport + ?Sized>(
    provider: &T,
    net: &NetworkConfig,
) -> Result<NetworkOutcome, NetworkError> {
    let switch = provider
        .request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": net.chain_id_hex() }]),
        )
        .await;

    match switch {
        Ok(_) => {
            log::info!("🔀 Switched wallet to {}", net.name);
            Ok(NetworkOutcome::Switched)
        }
        Err(e) if e.is_unrecognized_chain() => {
            log::info!("➕ {} unknown to wallet, requesting add", net.name);
            provider
                .request("wallet_addEthereumChain", add_chain_params(net))
                .await
                .map_err(|source| NetworkError::NotAdded {
                    network: net.name.clone(),
                    source,
                })?;
            Ok(NetworkOutcome::Added)
        }
        Err(source) => Err(NetworkError::SwitchFailed {
            network: net.name.clone(),
            source,
        }),
    }
}

/// Make sure the wallet is on `net`, switching or adding as needed.
///
/// Issues at most one switch request (and one add request after a 4902).
pub async fn ensure_network<T: Transport + ?Sized>(
    provider: &T,
    net: &NetworkConfig,
) -> Result<NetworkOutcome, NetworkError> {
    let chain_id = current_chain_id(provider)
        .await
        .map_err(NetworkError::Query)?;
    if chain_id == net.chain_id {
        return Ok(NetworkOutcome::AlreadyActive);
    }
    log::warn!(
        "⚠️ Wallet on chain {chain_id}, expected {} ({})",
        net.chain_id,
        net.name
    );
    switch_to_network(provider, net).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{UNRECOGNIZED_CHAIN, USER_REJECTED};
    use crate::test_support::ScriptedWallet;

    #[tokio::test]
    async fn matching_chain_issues_no_switch() {
        let net = NetworkConfig::celo_mainnet();
        let wallet = ScriptedWallet::new(42220);
        let outcome = ensure_network(&*wallet, &net).await.unwrap();
        assert_eq!(outcome, NetworkOutcome::AlreadyActive);
        assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
    }

    #[tokio::test]
    async fn wrong_chain_switches_once() {
        let net = NetworkConfig::celo_mainnet();
        let wallet = ScriptedWallet::new(1);
        let outcome = ensure_network(&*wallet, &net).await.unwrap();
        assert_eq!(outcome, NetworkOutcome::Switched);
        assert_eq!(wallet.count("wallet_switchEthereumChain"), 1);
        assert_eq!(wallet.count("wallet_addEthereumChain"), 0);
        assert_eq!(wallet.chain_id(), 42220);
    }

    #[tokio::test]
    async fn unknown_chain_is_added() {
        let net = NetworkConfig::celo_mainnet();
        let wallet = ScriptedWallet::new(1);
        wallet.fail_switch_with(UNRECOGNIZED_CHAIN, "Unrecognized chain ID");
        let outcome = ensure_network(&*wallet, &net).await.unwrap();
        assert_eq!(outcome, NetworkOutcome::Added);
        assert_eq!(wallet.count("wallet_addEthereumChain"), 1);

        let params = wallet.last_params("wallet_addEthereumChain").unwrap();
        assert_eq!(params[0]["chainId"], "0xa4ec");
        assert_eq!(params[0]["nativeCurrency"]["symbol"], "CELO");
        assert_eq!(params[0]["rpcUrls"][0], "https://forno.celo.org");
    }

    #[tokio::test]
    async fn rejected_add_and_rejected_switch_differ() {
        let net = NetworkConfig::celo_mainnet();

        let wallet = ScriptedWallet::new(1);
        wallet.fail_switch_with(UNRECOGNIZED_CHAIN, "Unrecognized chain ID");
        wallet.fail_add_with(USER_REJECTED, "User rejected the request.");
        let err = ensure_network(&*wallet, &net).await.unwrap_err();
        assert!(matches!(err, NetworkError::NotAdded { .. }));

        let wallet = ScriptedWallet::new(1);
        wallet.fail_switch_with(USER_REJECTED, "User rejected the request.");
        let err = ensure_network(&*wallet, &net).await.unwrap_err();
        assert!(matches!(err, NetworkError::SwitchFailed { .. }));
        assert_eq!(wallet.count("wallet_addEthereumChain"), 0);
    }
}
