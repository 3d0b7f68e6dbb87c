//! Disaster Reports - on-chain disaster reporting client
//!
//! Users connect a wallet, file disaster reports to a registry contract on an
//! EVM chain (Celo by default), attach images pinned to IPFS, and browse what
//! others have reported.
//!
//! ## Architecture
//!
//! - **Reads** go straight to a JSON-RPC endpoint ([`contract::ReportReader`])
//! - **Writes** go through the user's wallet ([`contract::ReportWriter`]),
//!   validating the network before every transaction
//! - **Session** state follows the wallet's account and chain events
//!   ([`session::WalletSession`])
//!
//! The wallet is reached two ways:
//! - **Native**: a local wallet JSON-RPC bridge, polled for events
//! - **Web**: the injected `window.ethereum` provider
//!
//! ## Usage
//!
//! For native builds:
//! ```bash
//! cargo build --features native
//! ```
//!
//! For web builds:
//! ```bash
//! cargo build --target wasm32-unknown-unknown --no-default-features --features dom-web
//! ```

// Core modules (available on all platforms)
pub mod config;
pub mod errors;
pub mod models;

// Contract surface and JSON-RPC plumbing
pub mod abi;
pub mod rpc;

// Wallet provider abstraction (native bridge / injected provider)
pub mod provider;
pub mod network;

pub mod contract;
pub mod notify;
pub mod storage;

pub mod session;
pub mod verification;
pub mod submission;
pub mod pinning;

// Routes and page controllers
pub mod router;
pub mod pages;

// JS exports for the browser front-end
#[cfg(all(target_arch = "wasm32", feature = "dom-web"))]
pub mod wasm_api;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod test_support;
